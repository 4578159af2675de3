use std::fmt::Write;

use comfy_table::{Cell, Color as TableColor};

use crate::insights::CheckoutInsights;

use super::styling::{bright, bright_green, bright_red, bright_yellow, cyan, dim};
use super::tables::{color_coded_duration_cell, create_cyan_header, create_table};

/// Prints a human-readable summary of the extracted checkouts to stderr.
///
/// stdout is left for the JSON document so the two can be piped apart.
pub fn print_summary(insights: &CheckoutInsights) {
    eprintln!("{}", render_summary(insights));
}

fn add_section_header(output: &mut String, emoji: &str, title: &str) {
    let _ = writeln!(output, "{} {}", bright(emoji), bright(title).underlined());
}

fn format_parameters(parameters: &[(String, String)]) -> String {
    if parameters.is_empty() {
        "None".to_string()
    } else {
        parameters
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn render_summary(insights: &CheckoutInsights) -> String {
    let mut output = String::new();

    add_section_header(&mut output, "📊", "Overview");

    let failures = |count: usize| {
        if count == 0 {
            bright_green(count)
        } else {
            bright_red(count)
        }
    };

    let _ = write!(
        output,
        "  {} {}\n  {} {}\n  {} {}\n  {} {}\n  {} {}\n  {} {}\n  {} {}\n\n",
        dim("Log file:"),
        cyan(insights.log_file.display()),
        dim("Run ID:"),
        cyan(&insights.run_id),
        dim("Repository:"),
        cyan(&insights.main_repository),
        dim("Fragments captured:"),
        bright_yellow(insights.total_fragments),
        dim("Checkouts:"),
        bright_yellow(insights.checkouts.len()),
        dim("Failed checkouts:"),
        failures(insights.failed_checkouts),
        dim("Failed reports:"),
        failures(insights.failed_reports),
    );

    if insights.checkouts.is_empty() {
        let _ = writeln!(output, "{}", bright_yellow("No checkout steps found."));
        return output;
    }

    add_section_header(&mut output, "📦", "Checkout Steps");

    let mut table = create_table();
    table.set_header(create_cyan_header(&[
        "Step",
        "Repository",
        "Duration",
        "Started",
        "Parameters",
    ]));

    for checkout in &insights.checkouts {
        table.add_row(vec![
            Cell::new(&checkout.step_id),
            Cell::new(&checkout.repository).fg(TableColor::Cyan),
            color_coded_duration_cell(checkout.duration),
            Cell::new(&checkout.start_time),
            Cell::new(format_parameters(&checkout.parameters)),
        ]);
    }

    let _ = writeln!(output, "{table}");
    output
}
