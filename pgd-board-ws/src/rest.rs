/// REST collaborators of a board session: snapshot fetch and move persistence.
///
/// Both are called by the session owner, never by the sync core. A snapshot
/// is fetched on open and again after every reconnect; a move is persisted
/// after it has already been applied locally.
use pgd_board_core::{MoveIntent, Task, TaskId};
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum RestError {
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Server returned {status}: {body}")]
    Status { status: u16, body: String },
}

/// Body of a move persistence call.
#[derive(Debug, Serialize)]
struct MoveBody<'a> {
    estado: &'a str,
    orden: usize,
}

pub struct RestClient {
    client: reqwest::Client,
    api_url: String,
}

impl RestClient {
    pub fn new(api_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: api_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn snapshot_url(&self, board_id: &str) -> String {
        format!("{}/boards/{}/tasks", self.api_url, board_id)
    }

    pub fn move_url(&self, task_id: TaskId) -> String {
        format!("{}/tasks/{}/move", self.api_url, task_id)
    }

    /// Full task list of a board.
    pub async fn fetch_snapshot(&self, board_id: &str) -> Result<Vec<Task>, RestError> {
        let resp = self.client.get(self.snapshot_url(board_id)).send().await?;
        let resp = check_status(resp).await?;
        let tasks: Vec<Task> = resp.json().await?;
        log::debug!(
            target: "pgd.rest",
            "Fetched {} tasks for board {}",
            tasks.len(),
            board_id
        );
        Ok(tasks)
    }

    /// Tell the server task X now sits in lane Y at position Z.
    pub async fn persist_move(&self, intent: &MoveIntent) -> Result<(), RestError> {
        let body = MoveBody {
            estado: &intent.to_state,
            orden: intent.index,
        };
        let resp = self
            .client
            .put(self.move_url(intent.task_id))
            .json(&body)
            .send()
            .await?;
        check_status(resp).await?;
        log::debug!(
            target: "pgd.rest",
            "Persisted move of task {} to {:?}[{}]",
            intent.task_id,
            intent.to_state,
            intent.index
        );
        Ok(())
    }
}

async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, RestError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(RestError::Status {
        status: status.as_u16(),
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls_trim_trailing_slash() {
        let client = RestClient::new("http://localhost:3000/api/");
        assert_eq!(
            client.snapshot_url("12"),
            "http://localhost:3000/api/boards/12/tasks"
        );
        assert_eq!(client.move_url(4), "http://localhost:3000/api/tasks/4/move");
    }

    #[test]
    fn test_move_body() {
        let body = MoveBody {
            estado: "Done",
            orden: 2,
        };
        assert_eq!(
            serde_json::to_string(&body).unwrap(),
            r#"{"estado":"Done","orden":2}"#
        );
    }
}
