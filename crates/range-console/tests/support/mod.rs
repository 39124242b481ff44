//! Test support: a scripted `InstanceApi` whose calls block until the test
//! resolves them, so completion order is under the test's control.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use range_common::{
    AdminIdentity, ContainerLogs, Instance, InstancePage, InstanceQuery, InstanceStatus, StatsSnapshot,
};
use range_console::{Console, InstanceApi};
use range_sdk::{GatewayError, Router, Session, SessionGuard};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::oneshot;

type Responder<T> = oneshot::Sender<Result<T, GatewayError>>;

struct Gate<A, T> {
    args: A,
    tx: Option<Responder<T>>,
}

#[derive(Default)]
struct Script {
    lists: Vec<Gate<InstanceQuery, InstancePage>>,
    stats: Vec<Gate<String, StatsSnapshot>>,
    logs: Vec<Gate<(String, u32), ContainerLogs>>,
}

#[derive(Default)]
pub struct ScriptedApi {
    script: Mutex<Script>,
}

impl ScriptedApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn lock(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap()
    }

    pub fn list_queries(&self) -> Vec<InstanceQuery> {
        self.lock().lists.iter().map(|g| g.args.clone()).collect()
    }

    pub fn stats_calls(&self) -> usize {
        self.lock().stats.len()
    }

    pub fn logs_calls(&self) -> Vec<(String, u32)> {
        self.lock().logs.iter().map(|g| g.args.clone()).collect()
    }

    pub fn resolve_list(&self, index: usize, result: Result<InstancePage, GatewayError>) {
        let tx = self.lock().lists[index].tx.take().expect("list call already resolved");
        let _ = tx.send(result);
    }

    pub fn resolve_stats(&self, index: usize, result: Result<StatsSnapshot, GatewayError>) {
        let tx = self.lock().stats[index].tx.take().expect("stats call already resolved");
        let _ = tx.send(result);
    }

    pub fn resolve_logs(&self, index: usize, result: Result<ContainerLogs, GatewayError>) {
        let tx = self.lock().logs[index].tx.take().expect("logs call already resolved");
        let _ = tx.send(result);
    }

    /// True once the task that issued stats call `index` has been dropped.
    pub fn stats_abandoned(&self, index: usize) -> bool {
        self.lock().stats[index].tx.as_ref().is_some_and(|tx| tx.is_closed())
    }

    pub fn logs_abandoned(&self, index: usize) -> bool {
        self.lock().logs[index].tx.as_ref().is_some_and(|tx| tx.is_closed())
    }

    pub async fn wait_lists(&self, n: usize) {
        wait_until(|| self.lock().lists.len() >= n).await;
    }

    pub async fn wait_stats(&self, n: usize) {
        wait_until(|| self.lock().stats.len() >= n).await;
    }

    pub async fn wait_logs(&self, n: usize) {
        wait_until(|| self.lock().logs.len() >= n).await;
    }
}

async fn wait_until(mut ready: impl FnMut() -> bool) {
    for _ in 0..500 {
        if ready() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    panic!("timed out waiting for scripted calls");
}

async fn gated<T>(rx: oneshot::Receiver<Result<T, GatewayError>>) -> Result<T, GatewayError> {
    rx.await
        .unwrap_or_else(|_| Err(GatewayError::Transport("responder dropped".to_string())))
}

#[async_trait]
impl InstanceApi for ScriptedApi {
    async fn list_instances(&self, query: &InstanceQuery) -> Result<InstancePage, GatewayError> {
        let (tx, rx) = oneshot::channel();
        self.lock().lists.push(Gate {
            args: query.clone(),
            tx: Some(tx),
        });
        gated(rx).await
    }

    async fn instance_stats(&self, instance_id: &str) -> Result<StatsSnapshot, GatewayError> {
        let (tx, rx) = oneshot::channel();
        self.lock().stats.push(Gate {
            args: instance_id.to_string(),
            tx: Some(tx),
        });
        gated(rx).await
    }

    async fn instance_logs(&self, instance_id: &str, tail: u32) -> Result<ContainerLogs, GatewayError> {
        let (tx, rx) = oneshot::channel();
        self.lock().logs.push(Gate {
            args: (instance_id.to_string(), tail),
            tx: Some(tx),
        });
        gated(rx).await
    }
}

pub fn admin() -> AdminIdentity {
    AdminIdentity {
        id: "admin-1".to_string(),
        username: "admin".to_string(),
        email: "admin@range.local".to_string(),
        name: "Range Admin".to_string(),
    }
}

pub fn guard(location: &str, logged_in: bool) -> (Arc<SessionGuard>, Arc<Router>) {
    let session = Arc::new(Session::in_memory());
    if logged_in {
        session.login("tok-123", &admin()).unwrap();
    }
    let router = Arc::new(Router::new(location));
    (Arc::new(SessionGuard::new(session, router.clone())), router)
}

/// Mounts a console over `api` with a live session.
pub fn mount(api: &Arc<ScriptedApi>) -> Console {
    let (guard, _) = guard("/admin/instances", true);
    Console::mount(api.clone(), &guard).unwrap()
}

/// Mounts a console and applies a first page holding `rows`.
pub async fn mount_with(api: &Arc<ScriptedApi>, rows: Vec<Instance>) -> Console {
    let mut console = mount(api);
    api.wait_lists(1).await;
    api.resolve_list(0, Ok(page(rows)));
    console.settle().await;
    console
}

pub fn instance(id: &str, status: InstanceStatus, container: Option<&str>) -> Instance {
    Instance {
        id: id.to_string(),
        challenge_id: "chal-1".to_string(),
        challenge_title: Some("Nginx basics".to_string()),
        user_id: Some("user-1".to_string()),
        status,
        container_id: container.map(str::to_string),
        docker_host_id: Some("host-1".to_string()),
        port: Some(20001),
        expires_at: Some(Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap()),
        created_at: Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap(),
    }
}

pub fn page(list: Vec<Instance>) -> InstancePage {
    InstancePage {
        total: list.len() as u64,
        list,
        page: 1,
        page_size: 10,
    }
}

pub fn snapshot(cpu_percent: f64) -> StatsSnapshot {
    StatsSnapshot {
        container_id: "c0ffee".to_string(),
        cpu_percent,
        memory_usage: 64 * 1024 * 1024,
        memory_limit: 256 * 1024 * 1024,
        memory_percent: 25.0,
        network_rx: 2048,
        network_tx: 1024,
    }
}

pub fn logs(text: &str) -> ContainerLogs {
    ContainerLogs {
        logs: text.to_string(),
        container_id: "c0ffee".to_string(),
    }
}
