use std::env;
use std::process::ExitCode;

use dotenv::dotenv;

use agent_callbacks::agents::{attach_logging, run_on, scenarios};
use agent_callbacks::config::PipelineConfig;
use agent_callbacks::error::ConfigError;

const USAGE: &str = "usage: callback_demo [--trace] [all | <scenario>...]";

fn load_config() -> Result<PipelineConfig, ConfigError> {
    match env::var("CALLBACKS_CONFIG") {
        Ok(path) => {
            log::info!("Loading pipeline config from {}", path);
            PipelineConfig::from_file(path)
        }
        Err(_) => PipelineConfig::from_env(),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv().ok();
    env_logger::init();

    let mut trace = false;
    let mut wanted = Vec::new();
    for arg in env::args().skip(1) {
        match arg.as_str() {
            "--trace" => trace = true,
            "-h" | "--help" => {
                println!("{}", USAGE);
                return ExitCode::SUCCESS;
            }
            _ => wanted.push(arg),
        }
    }

    let base = match load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ {}", e);
            return ExitCode::FAILURE;
        }
    };

    let all = scenarios();
    let selected: Vec<_> = if wanted.is_empty() || wanted.iter().any(|w| w == "all") {
        all.iter().collect()
    } else {
        all.iter()
            .filter(|s| wanted.iter().any(|w| w == s.name))
            .collect()
    };
    if selected.is_empty() {
        let names: Vec<&str> = all.iter().map(|s| s.name).collect();
        eprintln!("No matching scenario. Available: {}", names.join(", "));
        eprintln!("{}", USAGE);
        return ExitCode::FAILURE;
    }

    let mut failed = false;
    for scenario in selected {
        println!("\n{}", "=".repeat(70));
        println!("🎬 {} ({})", scenario.name, scenario.agent);
        println!("{}", "=".repeat(70));

        let pipeline = scenario.agent.build(&base);
        let pipeline = if trace { attach_logging(pipeline) } else { pipeline };

        match run_on(&pipeline, scenario).await {
            Ok(reports) => {
                for report in reports {
                    println!("\n👤 [{}] {}", report.session_id, report.message);
                    for run in &report.outcome.tool_runs {
                        let marker = if run.blocked { "🚫" } else { "🔧" };
                        println!("{} {} {}", marker, run.call.name, run.result);
                    }
                    println!("🤖 {}", report.outcome.text());
                }
            }
            Err(e) => {
                log::error!("Scenario {} failed: {}", scenario.name, e);
                eprintln!("❌ {} failed: {}", scenario.name, e);
                failed = true;
            }
        }
    }

    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
