use pausa_core::{format_duration, HistoryStore};

pub fn run(limit: usize, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let store = HistoryStore::open()?;
    let records = store.recent(limit)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    if records.is_empty() {
        println!("No session history.");
        return Ok(());
    }

    println!(
        "{:<20} {:<11} {:<22} {:<9}",
        "Started", "Type", "Duration", "Completed"
    );
    for record in &records {
        println!(
            "{:<20} {:<11} {:<22} {:<9}",
            record.started_at.format("%Y-%m-%d %H:%M:%S"),
            record.session_type.as_str(),
            format_duration(std::time::Duration::from_millis(record.duration_ms)),
            if record.completed { "yes" } else { "no" }
        );
    }

    let completed = records.iter().filter(|r| r.completed).count();
    println!(
        "\n{} session{} shown, {} completed",
        records.len(),
        if records.len() == 1 { "" } else { "s" },
        completed
    );
    Ok(())
}
