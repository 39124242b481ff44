use clap::{Args, Parser, Subcommand, ValueEnum};
use range_common::{InstanceQuery, InstanceStatus, SubmissionQuery, SubmissionResult, DEFAULT_LOG_TAIL};
use std::path::PathBuf;
use std::time::Duration;

/// Command line front end for the Cyber Range admin console.
#[derive(Parser, Debug)]
#[command(name = "range-admin")]
#[command(about = "Inspect Cyber Range instances and their container telemetry")]
pub struct ConsoleConfig {
    /// API base URL; admin routes live under `{url}/admin`
    #[arg(long, env = "RANGE_API_URL", default_value = "http://127.0.0.1:8080/api")]
    pub api_url: String,

    /// Where the admin session is persisted between runs
    #[arg(long, env = "RANGE_SESSION_FILE", default_value = ".range-admin/session.json")]
    pub session_file: PathBuf,

    /// Transport timeout in seconds
    #[arg(long, env = "RANGE_HTTP_TIMEOUT_SECS", default_value_t = 10)]
    pub timeout_secs: u64,

    #[command(subcommand)]
    pub command: Command,
}

impl ConsoleConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Log in and persist the session
    Login {
        #[arg(short, long)]
        username: String,
        #[arg(short, long, env = "RANGE_ADMIN_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Clear the stored session
    Logout,
    /// Show the stored identity
    Whoami,
    /// List instances
    Instances(ListArgs),
    /// Show stats and logs of one instance on the selected page
    Inspect {
        instance_id: String,
        /// Log lines to fetch
        #[arg(long, default_value_t = DEFAULT_LOG_TAIL)]
        tail: u32,
        #[command(flatten)]
        list: ListArgs,
    },
    /// Dashboard counters
    Overview,
    /// List flag submissions
    Submissions(SubmissionArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    #[arg(long, value_enum)]
    pub status: Option<StatusFilter>,
    /// Challenge id
    #[arg(long)]
    pub challenge: Option<String>,
    #[arg(long)]
    pub search: Option<String>,
    #[arg(long, default_value_t = 1)]
    pub page: u32,
    #[arg(long, default_value_t = 10)]
    pub page_size: u32,
}

impl ListArgs {
    pub fn query(&self) -> InstanceQuery {
        InstanceQuery {
            page: self.page,
            page_size: self.page_size,
            status: self.status.map(Into::into),
            challenge: self.challenge.clone().filter(|c| !c.is_empty()),
            search: self.search.clone().filter(|s| !s.trim().is_empty()),
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct SubmissionArgs {
    /// User id
    #[arg(long)]
    pub user: Option<String>,
    /// Challenge id
    #[arg(long)]
    pub challenge: Option<String>,
    #[arg(long, value_enum)]
    pub result: Option<ResultFilter>,
    #[arg(long, default_value_t = 1)]
    pub page: u32,
    #[arg(long, default_value_t = 20)]
    pub page_size: u32,
}

impl SubmissionArgs {
    pub fn query(&self) -> SubmissionQuery {
        SubmissionQuery {
            page: self.page,
            page_size: self.page_size,
            user: self.user.clone().filter(|u| !u.is_empty()),
            challenge: self.challenge.clone().filter(|c| !c.is_empty()),
            result: self.result.map(Into::into),
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum ResultFilter {
    Correct,
    Wrong,
}

impl From<ResultFilter> for SubmissionResult {
    fn from(filter: ResultFilter) -> Self {
        match filter {
            ResultFilter::Correct => SubmissionResult::Correct,
            ResultFilter::Wrong => SubmissionResult::Wrong,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum StatusFilter {
    Running,
    Stopped,
    Expired,
}

impl From<StatusFilter> for InstanceStatus {
    fn from(filter: StatusFilter) -> Self {
        match filter {
            StatusFilter::Running => InstanceStatus::Running,
            StatusFilter::Stopped => InstanceStatus::Stopped,
            StatusFilter::Expired => InstanceStatus::Expired,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inspect_defaults() {
        let config = ConsoleConfig::try_parse_from(["range-admin", "inspect", "inst-1"]).unwrap();
        assert_eq!(config.timeout(), Duration::from_secs(10));
        match config.command {
            Command::Inspect { instance_id, tail, list } => {
                assert_eq!(instance_id, "inst-1");
                assert_eq!(tail, 200);
                assert_eq!(list.query(), InstanceQuery::default());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_instance_filters() {
        let config = ConsoleConfig::try_parse_from([
            "range-admin",
            "instances",
            "--status",
            "running",
            "--search",
            "nginx",
            "--page-size",
            "50",
        ])
        .unwrap();
        let Command::Instances(list) = config.command else {
            panic!("expected instances command");
        };
        let query = list.query();
        assert_eq!(query.status, Some(InstanceStatus::Running));
        assert_eq!(query.search.as_deref(), Some("nginx"));
        assert_eq!(query.page_size, 50);
        assert_eq!(query.page, 1);
    }

    #[test]
    fn test_submission_filters() {
        let config = ConsoleConfig::try_parse_from([
            "range-admin",
            "submissions",
            "--challenge",
            "chal-1",
            "--result",
            "correct",
        ])
        .unwrap();
        let Command::Submissions(args) = config.command else {
            panic!("expected submissions command");
        };
        let query = args.query();
        assert_eq!(query.challenge.as_deref(), Some("chal-1"));
        assert_eq!(query.result, Some(SubmissionResult::Correct));
        assert_eq!(query.user, None);
        assert_eq!(query.page_size, 20);
    }
}
