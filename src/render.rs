//! Human-readable rendering of the consolidated job listing.

use std::fmt::Write;

use crate::scheduler::Job;

const COMMAND_WIDTH: usize = 40;

/// Render jobs as an `ID / COMMAND / STATUS` table, one row per job.
pub fn render_table(jobs: &[Job]) -> String {
    if jobs.is_empty() {
        return "No jobs found.\n".to_string();
    }

    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = writeln!(
        out,
        "{:<6} {:<width$} {:<8}",
        "ID",
        "COMMAND",
        "STATUS",
        width = COMMAND_WIDTH
    );
    let _ = writeln!(out, "{}", "-".repeat(6 + 1 + COMMAND_WIDTH + 1 + 8));

    for job in jobs {
        let _ = writeln!(
            out,
            "{:<6} {:<width$} {:<8}",
            job.id,
            truncate(&job.command, COMMAND_WIDTH),
            job.status,
            width = COMMAND_WIDTH
        );
    }
    out
}

/// Shorten to at most `max` characters, ending in `...` when cut.
/// Newlines are flattened so each job stays on one row.
fn truncate(command: &str, max: usize) -> String {
    let flat: String = command
        .chars()
        .map(|c| if c == '\n' { ' ' } else { c })
        .collect();
    if flat.chars().count() <= max {
        return flat;
    }
    let mut cut: String = flat.chars().take(max - 3).collect();
    cut.push_str("...");
    cut
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::JobStatus;

    #[test]
    fn empty_listing() {
        assert_eq!(render_table(&[]), "No jobs found.\n");
    }

    #[test]
    fn one_row_per_job_in_order() {
        let mut done = Job::new(0, "echo hi".to_string());
        done.status = JobStatus::Done;
        let waiting = Job::new(1, "sleep 5".to_string());

        let table = render_table(&[done, waiting]);
        let lines: Vec<&str> = table.lines().collect();

        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("ID"));
        assert!(lines[0].contains("COMMAND"));
        assert!(lines[0].contains("STATUS"));
        assert!(lines[2].starts_with("0 "));
        assert!(lines[2].contains("echo hi"));
        assert!(lines[2].trim_end().ends_with("done"));
        assert!(lines[3].starts_with("1 "));
        assert!(lines[3].trim_end().ends_with("waiting"));
    }

    #[test]
    fn long_commands_are_truncated() {
        let long = "x".repeat(100);
        let cut = truncate(&long, COMMAND_WIDTH);
        assert_eq!(cut.chars().count(), COMMAND_WIDTH);
        assert!(cut.ends_with("..."));
    }

    #[test]
    fn multiline_commands_stay_on_one_row() {
        assert_eq!(truncate("echo a\necho b", COMMAND_WIDTH), "echo a echo b");
    }
}
