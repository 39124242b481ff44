use range_common::{format_bytes, AdminIdentity, Instance, OverviewStats, Submission, SubmissionResult};
use range_console::{LogsView, StatsView, TelemetryPanel, NOT_RUNNING, NO_CONTAINER};

pub fn identity(admin: &AdminIdentity) -> String {
    if admin.name.is_empty() {
        admin.username.clone()
    } else {
        format!("{} ({})", admin.name, admin.username)
    }
}

pub fn instance_table(rows: &[Instance], total: u64, page: u32, page_size: u32) -> String {
    if rows.is_empty() {
        return format!("No instances (total {total})");
    }

    let mut out = format!(
        "{:<38} {:<24} {:<9} {:<14} {:<6} {}\n",
        "ID", "CHALLENGE", "STATUS", "CONTAINER", "PORT", "EXPIRES"
    );
    for row in rows {
        let container: String = row.container().unwrap_or("-").chars().take(12).collect();
        let port = row.port.map(|p| p.to_string()).unwrap_or_else(|| "-".to_string());
        let expires = row
            .expires_at
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());
        out.push_str(&format!(
            "{:<38} {:<24} {:<9} {:<14} {:<6} {}\n",
            row.id,
            row.display_title(),
            row.status,
            container,
            port,
            expires
        ));
    }
    out.push_str(&format!("page {page} ({page_size} per page), {total} total"));
    out
}

pub fn submission_table(rows: &[Submission], total: u64, page: u32, page_size: u32) -> String {
    if rows.is_empty() {
        return format!("No submissions (total {total})");
    }

    let mut out = format!(
        "{:<12} {:<20} {:<24} {:<8} {:>6}  {}\n",
        "SUBMITTED", "USER", "CHALLENGE", "RESULT", "POINTS", "FLAG"
    );
    for row in rows {
        let user = row.user_display_name.as_deref().unwrap_or(&row.user_id);
        let challenge = row.challenge_title.as_deref().unwrap_or(&row.challenge_id);
        let result = match row.result() {
            SubmissionResult::Correct => "correct",
            SubmissionResult::Wrong => "wrong",
        };
        out.push_str(&format!(
            "{:<12} {:<20} {:<24} {:<8} {:>6}  {}\n",
            row.submitted_at.format("%m-%d %H:%M").to_string(),
            user,
            challenge,
            result,
            row.points,
            row.flag
        ));
    }
    out.push_str(&format!("page {page} ({page_size} per page), {total} total"));
    out
}

pub fn panel(panel: &TelemetryPanel) -> String {
    let mut out = format!(
        "{} [{}] {}\n\nResources\n",
        panel.instance().id,
        panel.instance().status,
        panel.instance().display_title()
    );

    match panel.stats_view() {
        StatsView::NotRunning => out.push_str(&format!("  {NOT_RUNNING}\n")),
        StatsView::Loading => out.push_str("  loading...\n"),
        StatsView::Failed(error) => out.push_str(&format!("  error: {error}\n")),
        StatsView::Empty => out.push_str("  no data\n"),
        StatsView::Ready { snapshot, error } => {
            if let Some(error) = error {
                out.push_str(&format!("  error: {error} (showing last reading)\n"));
            }
            out.push_str(&format!("  cpu      {:.2}%\n", snapshot.cpu_percent));
            out.push_str(&format!(
                "  memory   {} / {} ({:.2}%)\n",
                format_bytes(snapshot.memory_usage),
                format_bytes(snapshot.memory_limit),
                snapshot.memory_percent
            ));
            out.push_str(&format!(
                "  network  rx {} / tx {}\n",
                format_bytes(snapshot.network_rx),
                format_bytes(snapshot.network_tx)
            ));
        }
    }

    out.push_str(&format!("\nLogs (last {} lines)\n", panel.tail()));
    match panel.logs_view() {
        LogsView::NoContainer => out.push_str(&format!("  {NO_CONTAINER}\n")),
        LogsView::Loading => out.push_str("  loading...\n"),
        LogsView::Ready { text, error } => {
            if let Some(error) = error {
                out.push_str(&format!("  error: {error}\n"));
            }
            out.push_str(text);
            if !text.ends_with('\n') {
                out.push('\n');
            }
        }
    }
    out
}

pub fn overview(stats: &OverviewStats) -> String {
    let mut out = format!(
        "Instances today   {}\nRunning instances {}\nSubmissions today {}\nCorrect rate      {}%\n",
        stats.today_instances, stats.running_instances, stats.today_submissions, stats.today_correct_rate
    );
    if !stats.hot_challenges.is_empty() {
        out.push_str("\nHot challenges\n");
        for hot in &stats.hot_challenges {
            out.push_str(&format!("  {:<32} {}\n", hot.title, hot.count));
        }
    }
    if !stats.recent_submissions.is_empty() {
        out.push_str("\nRecent submissions\n");
        for sub in &stats.recent_submissions {
            out.push_str(&format!(
                "  {} {:<20} {:<32} {}\n",
                sub.created_at.format("%m-%d %H:%M"),
                sub.user_display_name,
                sub.challenge_title,
                sub.result
            ));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use range_common::chrono::Utc;
    use range_common::InstanceStatus;

    #[test]
    fn test_empty_table() {
        assert_eq!(instance_table(&[], 0, 1, 10), "No instances (total 0)");
    }

    #[test]
    fn test_submission_table_falls_back_to_ids() {
        let row = Submission {
            id: "sub-1".to_string(),
            user_id: "user-1".to_string(),
            challenge_id: "chal-1".to_string(),
            challenge_title: None,
            user_display_name: Some("alice".to_string()),
            flag: "flag{ok}".to_string(),
            is_correct: true,
            points: 100,
            submitted_at: Utc::now(),
        };
        let rendered = submission_table(&[row], 1, 1, 20);
        assert!(rendered.contains("alice"));
        assert!(rendered.contains("chal-1"));
        assert!(rendered.contains("correct"));
        assert!(rendered.ends_with("page 1 (20 per page), 1 total"));
        assert_eq!(submission_table(&[], 0, 1, 20), "No submissions (total 0)");
    }

    #[test]
    fn test_stopped_panel_shows_placeholder() {
        let instance = Instance {
            id: "inst-1".to_string(),
            challenge_id: "chal-1".to_string(),
            challenge_title: None,
            user_id: None,
            status: InstanceStatus::Stopped,
            container_id: None,
            docker_host_id: None,
            port: None,
            expires_at: None,
            created_at: Utc::now(),
        };
        let rendered = panel(&TelemetryPanel::new(instance, 1));
        assert!(rendered.contains(NOT_RUNNING));
        assert!(rendered.contains(NO_CONTAINER));
        assert!(!rendered.contains("loading"));
    }
}
