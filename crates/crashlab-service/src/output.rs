//! Output formatting for crashlabd

use anyhow::Error;
use colored::Colorize;
use serde::Serialize;
use serde_json::json;

use crashlab_damage::SafetyRating;
use crashlab_service::{Assessment, HealthStatus};

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{s}"),
        Err(e) => eprintln!("Failed to format output as JSON: {e}"),
    }
}

/// Print error in JSON format
pub fn print_error_json(error: &Error, exit_code: u8) {
    print_json(&json!({
        "success": false,
        "error": {
            "message": error.to_string(),
            "exit_code": exit_code,
        }
    }));
}

/// Print error in human-readable format
pub fn print_error_human(error: &Error) {
    eprintln!("{} {}", "Error:".red().bold(), error);
    for cause in error.chain().skip(1) {
        eprintln!("  {} {}", "Caused by:".yellow(), cause);
    }
}

/// Print a damage assessment
pub fn print_assessment(assessment: &Assessment, json: bool) {
    if json {
        print_json(&json!({ "success": true, "assessment": assessment }));
        return;
    }

    let analysis = &assessment.analysis;
    let safety = &analysis.safety;
    let estimate = &assessment.estimate;

    println!(
        "{} {}",
        "Damage assessment for session".bold(),
        assessment.sample.session_id()
    );
    println!(
        "  Overall score: {:.1} ({})",
        analysis.overall_score, analysis.damage_class
    );
    let rating = match safety.overall_rating {
        SafetyRating::Safe => safety.overall_rating.as_str().green(),
        SafetyRating::MinorConcern | SafetyRating::Caution => {
            safety.overall_rating.as_str().yellow()
        }
        SafetyRating::Unsafe => safety.overall_rating.as_str().red().bold(),
    };
    println!("  Safety rating: {rating}");
    println!("  Driveable: {}", yes_no(safety.driveable));
    println!("  Inspection required: {}", yes_no(safety.inspection_required));
    for concern in &safety.safety_concerns {
        println!("    {} {}", "!".red(), concern);
    }

    if estimate.recommendations.is_empty() {
        println!("{}", "No repairs needed".green());
    } else {
        println!("{}", "Repairs:".bold());
        for rec in &estimate.recommendations {
            println!(
                "  {}. {} [{}] {:.1}% {} ({}, {})",
                rec.priority,
                rec.zone_name,
                rec.urgency,
                rec.damage_level,
                rec.scope,
                rec.estimated_time,
                rec.estimated_cost
            );
            if !rec.parts_needed.is_empty() {
                println!("     Parts: {}", rec.parts_needed.join(", "));
            }
        }
    }
    println!("  Zone total: {}", estimate.zone_total);
    println!("  {} {}", "Pre-tax total:".bold(), estimate.pre_tax_total);
    if let Some(inspection) = &estimate.inspection {
        println!(
            "  Inspection: {} ({}, {})",
            inspection.description, inspection.estimated_time, inspection.cost
        );
    }

    println!("{}", "Next steps:".bold());
    for step in &estimate.next_steps {
        println!("  - {step}");
    }
    println!("  Estimate id: {}", assessment.estimate_id);
}

/// Print a health check result
pub fn print_health(status: &HealthStatus, json: bool) {
    if json {
        print_json(&json!({ "success": status.connected, "health": status }));
        return;
    }

    let connected = if status.connected {
        "connected".green()
    } else {
        "unreachable".red()
    };
    println!("Simulator: {connected}");
    if let Some(ms) = status.response_time_ms {
        println!("  Response time: {ms}ms");
    }
    println!("  Active sessions: {}", status.active_sessions);
}

fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}
