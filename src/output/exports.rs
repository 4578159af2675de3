use anyhow::Result;
use std::io::Write;

use crate::config::OutputFormat;
use crate::insights::CheckoutInsights;

/// Writes the extracted checkouts in the requested machine-readable format.
pub fn export_insights(
    insights: &CheckoutInsights,
    format: OutputFormat,
    pretty: bool,
    output: &mut dyn Write,
) -> Result<()> {
    match format {
        OutputFormat::Json => export_json(insights, pretty, output),
        OutputFormat::Csv => export_csv(insights, output),
    }
}

fn export_json(insights: &CheckoutInsights, pretty: bool, output: &mut dyn Write) -> Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(insights)?
    } else {
        serde_json::to_string(insights)?
    };
    writeln!(output, "{}", json)?;
    Ok(())
}

fn export_csv(insights: &CheckoutInsights, output: &mut dyn Write) -> Result<()> {
    writeln!(
        output,
        "Run ID,Step ID,Repository,Start Time,Finish Time,Duration,Parameters"
    )?;

    for checkout in &insights.checkouts {
        writeln!(
            output,
            "{},{},{},{},{},{:.6},{}",
            csv_field(&insights.run_id),
            csv_field(&checkout.step_id),
            csv_field(&checkout.repository),
            csv_field(&checkout.start_time),
            csv_field(&checkout.finish_time),
            checkout.duration,
            csv_field(&checkout.parameters_json()?),
        )?;
    }

    Ok(())
}

fn csv_field(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}
