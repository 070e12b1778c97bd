use crate::cli::{load_config, GatesArgs};
use epicflow::gates::{
    check_gates, override_report, request_manual_override, GateReport, ShellRunner,
};
use tracing::{info, warn};

pub async fn execute(args: GatesArgs) -> anyhow::Result<()> {
    let config = load_config(&args.config)?;
    let mut gating = config.gating;
    gating.require_tests |= args.tests;
    gating.require_docs |= args.docs;

    if !gating.require_tests && !gating.require_docs {
        info!("No gates enabled; use --tests/--docs or set gating in config");
    }

    let mut report = check_gates(&args.path, &gating, &ShellRunner).await;

    if let Some(reason) = &args.override_reason {
        if report.passed() {
            info!("All gates passed; override not needed");
        } else if !gating.allow_manual_override {
            warn!("Manual override is disabled in config");
        } else {
            report = override_report(report, &gating, reason);
        }
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if !report.passed() {
        std::process::exit(1);
    }
    Ok(())
}

fn print_report(report: &GateReport) {
    for gate in report.gates.iter() {
        let mark = if gate.overridden { " (overridden)" } else { "" };
        println!(
            "{:<6} {:<4} {}{}",
            gate.gate_type.to_string(),
            gate.result.to_string(),
            gate.message,
            mark
        );
        if let Some(missing) = gate
            .details
            .as_ref()
            .and_then(|d| d.get("missing"))
            .and_then(|m| m.as_array())
        {
            for item in missing.iter().filter_map(|m| m.as_str()) {
                println!("         missing: {}", item);
            }
        }
    }
    println!();
    println!("Overall: {}", report.overall);
    if report.can_override {
        for gate in report.failed_gates() {
            let request = request_manual_override(gate.gate_type, &gate.message);
            let options: Vec<String> = request
                .options
                .iter()
                .map(|o| o.to_string())
                .collect();
            println!(
                "{} gate needs a decision ({}); override with --override <REASON>",
                request.gate_type,
                options.join("/")
            );
        }
    }
}
