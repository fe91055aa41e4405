//! Plain-text cards and tables for the CLI.

use chrono::Utc;
use imitra_core::{Classification, ClassificationMethod, Department, Priority, SlaPolicy};

// ── Classification ──

/// Print a classification as a vertical card, with the SLA it would start.
pub fn print_classification(title: &str, c: &Classification) {
    println!("=== {title} ===");
    println!();

    println!("Classification");
    row("category", c.category);
    row("department", c.department);
    row("priority", c.priority);
    row("confidence", format!("{:.0}%", c.confidence * 100.0));
    row(
        "method",
        match c.method {
            ClassificationMethod::Ai => "ai",
            ClassificationMethod::Keyword => "keyword",
        },
    );
    println!();

    let now = Utc::now();
    println!("SLA");
    for policy in SlaPolicy::ALL {
        let sla = policy.start(c.department, c.priority, now);
        row(
            policy.as_str(),
            format!(
                "{}h (due {})",
                sla.allotted_hours,
                sla.deadline.format("%Y-%m-%d %H:%M UTC")
            ),
        );
    }
}

// ── SLA table ──

/// Allowance table: one row per department, one column per priority.
pub fn print_sla_table(policy: SlaPolicy, departments: &[Department]) {
    let priorities = [
        Priority::Critical,
        Priority::High,
        Priority::Medium,
        Priority::Low,
    ];

    println!("SLA policy: {policy}");
    print!("  {:<26}", "department");
    for p in priorities {
        print!(" {:>9}", p.as_str());
    }
    println!();

    for &d in departments {
        print!("  {:<26}", d.as_str());
        for p in priorities {
            print!(" {:>8}h", policy.allotted_hours(d, p));
        }
        if d.is_urgent() {
            print!("  (urgent)");
        }
        println!();
    }
}

fn row(label: &str, value: impl std::fmt::Display) {
    println!("  {label:<26} {value}");
}
