use crate::error::{Result, WqbError};
use crate::session::{ApiReply, SimulationApi};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Simulate,
    Progress,
    Alpha,
    Submit,
    SubmitStatus,
}

/// 按端点排队回放响应的假服务；队列耗尽时返回网络错误
#[derive(Default)]
pub struct ScriptedApi {
    queues: Mutex<HashMap<Endpoint, VecDeque<Result<ApiReply>>>>,
    calls: Mutex<HashMap<Endpoint, usize>>,
    payloads: Mutex<Vec<Value>>,
}

impl ScriptedApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, endpoint: Endpoint, reply: ApiReply) -> &Self {
        self.push_result(endpoint, Ok(reply))
    }

    pub fn push_result(&self, endpoint: Endpoint, reply: Result<ApiReply>) -> &Self {
        self.queues
            .lock()
            .unwrap()
            .entry(endpoint)
            .or_default()
            .push_back(reply);
        self
    }

    pub fn calls(&self, endpoint: Endpoint) -> usize {
        self.calls
            .lock()
            .unwrap()
            .get(&endpoint)
            .copied()
            .unwrap_or(0)
    }

    pub fn payloads(&self) -> Vec<Value> {
        self.payloads.lock().unwrap().clone()
    }

    fn next(&self, endpoint: Endpoint) -> Result<ApiReply> {
        *self.calls.lock().unwrap().entry(endpoint).or_default() += 1;
        self.queues
            .lock()
            .unwrap()
            .get_mut(&endpoint)
            .and_then(|q| q.pop_front())
            .unwrap_or_else(|| Err(WqbError::Transport(format!("{:?} 脚本已耗尽", endpoint))))
    }
}

#[async_trait]
impl SimulationApi for ScriptedApi {
    async fn submit_simulation(&self, payload: &Value) -> Result<ApiReply> {
        self.payloads.lock().unwrap().push(payload.clone());
        self.next(Endpoint::Simulate)
    }

    async fn get_progress(&self, _location: &str) -> Result<ApiReply> {
        self.next(Endpoint::Progress)
    }

    async fn get_alpha(&self, _alpha_id: &str) -> Result<ApiReply> {
        self.next(Endpoint::Alpha)
    }

    async fn submit_alpha(&self, _alpha_id: &str) -> Result<ApiReply> {
        self.next(Endpoint::Submit)
    }

    async fn get_submit_status(&self, _alpha_id: &str) -> Result<ApiReply> {
        self.next(Endpoint::SubmitStatus)
    }
}
