//! AVM Test Bridge CLI
//!
//! Entry point for the `avm-test` command-line tool.

use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use avm_test_bridge::assembler::{ClasspathSource, ConfigAssembler};
use avm_test_bridge::bridge::{
    default_home_probe, TestBridge, EXIT_CODE_CANCELLED, EXIT_CODE_TESTS_FAILED,
};
use avm_test_bridge::config::ConfigSource;
use avm_test_bridge::device::{DeviceCatalog, FileDeviceCatalog};
use avm_test_bridge::discovery::{TestClass, TestsToRun};
use avm_test_bridge::logger::ConsoleLogger;
use avm_test_bridge::mock::{
    MockCompiler, MockDeviceCatalog, MockResolver, MockSigningCatalog, MockTestClient, TestOutcome,
};
use avm_test_bridge::options::RunOptions;
use avm_test_bridge::resolver::LocalRepoResolver;
use avm_test_bridge::selection::patterns_for_class;
use avm_test_bridge::signing::StaticSigningCatalog;

#[derive(Parser)]
#[command(name = "avm-test")]
#[command(about = "Cross-process test execution bridge for AVM targets", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the effective build configuration for a project
    Config {
        /// Project directory (default: current directory)
        #[arg(long, short = 'p', default_value = ".")]
        project_dir: PathBuf,

        /// Toolchain home to probe instead of the default location
        #[arg(long)]
        home: Option<PathBuf>,

        /// Output in human-readable format instead of JSON
        #[arg(long)]
        human: bool,
    },

    /// Explain which method patterns a raw specification yields
    Select {
        /// Fully-qualified test class name
        class: String,

        /// Declared public methods of the class
        #[arg(long, short = 'm', required = true)]
        method: Vec<String>,

        /// Raw method specification (e.g. "com.acme.FooTest#testA+testB")
        #[arg(long, short = 's')]
        spec: Option<String>,
    },

    /// List simulator device types from an inventory file
    Devices {
        /// Path to the device inventory (default: devices.toml)
        #[arg(long, short = 'i', default_value = "devices.toml")]
        inventory: PathBuf,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Drive a full bridge run against the in-process mock collaborators
    Selftest {
        /// Exercise the iOS simulator path instead of the console path
        #[arg(long)]
        ios: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Config {
            project_dir,
            home,
            human,
        } => run_config(project_dir, home, human),
        Commands::Select {
            class,
            method,
            spec,
        } => run_select(&class, &method, spec.as_deref()),
        Commands::Devices { inventory, json } => run_devices(&inventory, json),
        Commands::Selftest { ios } => run_selftest(ios),
    }
}

/// Serializable view of the effective configuration
#[derive(Serialize)]
struct EffectiveView {
    os: String,
    arch: String,
    home: String,
    dev_home: bool,
    classpath: Vec<String>,
    force_link_classes: Vec<String>,
    skip_signing: bool,
    skip_install: bool,
    cache_dir: Option<String>,
    sources: Vec<ConfigSource>,
}

fn run_config(project_dir: PathBuf, home: Option<PathBuf>, human: bool) {
    let options = RunOptions::from_env();
    let logger = ConsoleLogger::shared(options.debug_logging);
    let cache_root = options
        .cache_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from(".avm"));
    let resolver = LocalRepoResolver::new(cache_root, Arc::clone(&logger));
    let signing = StaticSigningCatalog::default();
    let classpath_source = ClasspathSource::SearchRoots(Vec::new());
    let probe = default_home_probe(home.as_deref());

    let assembler = ConfigAssembler {
        project_dir: &project_dir,
        options: &options,
        home_probe: probe.as_deref(),
        toolchain_version: env!("CARGO_PKG_VERSION"),
        resolver: &resolver,
        signing: &signing,
        classpath_source: &classpath_source,
        runtime_classpath: &[],
        logger,
    };

    let config = assembler
        .assemble(&TestsToRun::default())
        .and_then(|builder| Ok(builder.build()?));
    let config = match config {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error assembling configuration: {}", e);
            process::exit(1);
        }
    };

    let view = EffectiveView {
        os: config.os().to_string(),
        arch: config.arch().to_string(),
        home: config.home().path().display().to_string(),
        dev_home: config.home().is_dev(),
        classpath: config.classpath().iter().map(|e| e.to_string()).collect(),
        force_link_classes: config.force_link_classes().to_vec(),
        skip_signing: config.skip_signing(),
        skip_install: config.skip_install(),
        cache_dir: config.cache_dir().map(|d| d.display().to_string()),
        sources: config.sources().to_vec(),
    };

    if human {
        println!("Target:    {} ({})", view.os, view.arch);
        println!("Home:      {}{}", view.home, if view.dev_home { " (dev)" } else { "" });
        println!("Classpath ({} entries):", view.classpath.len());
        for entry in &view.classpath {
            println!("  {}", entry);
        }
        println!("Sources:   {}", view.sources.len());
    } else {
        match serde_json::to_string_pretty(&view) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error serializing configuration: {}", e);
                process::exit(1);
            }
        }
    }
}

fn run_select(class_name: &str, methods: &[String], spec: Option<&str>) {
    let method_refs: Vec<&str> = methods.iter().map(String::as_str).collect();
    let class = TestClass::new(class_name, &method_refs);
    let patterns = patterns_for_class(&class, spec);

    if patterns.is_empty() {
        println!("(no patterns: {} contributes a no-op test set)", class_name);
        return;
    }
    for pattern in patterns {
        println!("{}", pattern);
    }
}

fn run_devices(inventory: &PathBuf, json: bool) {
    let catalog = match FileDeviceCatalog::load(inventory) {
        Ok(catalog) => catalog,
        Err(e) => {
            eprintln!("Error loading device inventory: {}", e);
            process::exit(1);
        }
    };

    let devices = catalog.list();
    if json {
        match serde_json::to_string_pretty(&devices) {
            Ok(out) => println!("{}", out),
            Err(e) => {
                eprintln!("Error serializing devices: {}", e);
                process::exit(1);
            }
        }
        return;
    }

    if devices.is_empty() {
        println!("No devices in inventory");
        return;
    }
    for device in devices {
        let archs: Vec<String> = device.archs.iter().map(|a| a.to_string()).collect();
        println!(
            "{}  sdk {}  [{}]",
            device.name,
            device.sdk_version,
            archs.join(", ")
        );
    }
}

/// End-to-end conformance run against the in-process mocks: scripted
/// remote outcomes flow through the relay into the reporting pipeline
/// exactly as a real run would.
fn run_selftest(ios: bool) {
    let selftest_dir = std::env::temp_dir().join("avm-selftest");
    let home_dir = selftest_dir.join("home");
    let prepared = std::fs::create_dir_all(home_dir.join("lib"))
        .and_then(|_| std::fs::create_dir_all(home_dir.join("bin")))
        .and_then(|_| {
            std::fs::write(home_dir.join(avm_test_bridge::home::DEV_ROOT_MARKER), "")
        });
    if let Err(e) = prepared {
        eprintln!("Error preparing selftest home: {}", e);
        process::exit(1);
    }

    let compiler = MockCompiler::new();
    let process_state = compiler.process_state();

    let mut client = MockTestClient::new();
    client.link_process(process_state);
    client.script_class(
        "com.avm.selftest.SmokeTest",
        &[
            ("testStartup", TestOutcome::Pass),
            ("testRoundTrip", TestOutcome::Pass),
        ],
    );
    client.script_class(
        "com.avm.selftest.RelayTest",
        &[
            ("testFanout", TestOutcome::Pass),
            ("testSlowPath", TestOutcome::Ignore),
        ],
    );

    let options = RunOptions {
        os: Some(if ios { "ios" } else { "linux" }.to_string()),
        arch: Some("x86_64".to_string()),
        skip_signing: true,
        ..RunOptions::from_env()
    };

    let bridge = TestBridge::builder(Box::new(compiler), Box::new(client))
        .project_dir(selftest_dir.clone())
        .options(options)
        .home_probe(home_dir.clone())
        .resolver(Box::new(MockResolver::new("/repo")))
        .signing_catalog(Box::new(MockSigningCatalog::with_default_candidates()))
        .device_catalog(Box::new(MockDeviceCatalog::with_default_devices()))
        .discovered_classes(vec![
            TestClass::new("com.avm.selftest.SmokeTest", &["testStartup", "testRoundTrip"]),
            TestClass::new("com.avm.selftest.RelayTest", &["testFanout", "testSlowPath"]),
        ])
        .build();

    let cancel = bridge.cancel_flag();
    if let Err(e) = ctrlc::set_handler(move || {
        eprintln!("\nReceived interrupt, winding the run down...");
        cancel.cancel();
    }) {
        eprintln!("Error installing signal handler: {}", e);
        process::exit(1);
    }

    match bridge.invoke() {
        Ok(summary) => {
            println!("{}", summary.human_summary);
            if summary.is_success() {
                process::exit(0);
            } else if summary.outcome == avm_test_bridge::report::RunOutcome::Cancelled {
                process::exit(EXIT_CODE_CANCELLED);
            } else {
                process::exit(EXIT_CODE_TESTS_FAILED);
            }
        }
        Err(e) => {
            eprintln!("Selftest run failed: {}", e);
            process::exit(e.exit_code());
        }
    }
}
