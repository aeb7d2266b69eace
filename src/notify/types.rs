//! Eventos de workflow emitidos após cada transição confirmada.
//!
//! Todas as structs derivam `Serialize` e `Deserialize` para conversão JSON
//! no formato enviado ao webhook.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::grade::KpiContribution;
use crate::org::ActorId;
use crate::state_machine::{Task, TaskId, TaskStatus};

/// Um evento emitido depois que uma transição foi aplicada.
///
/// Carrega o identificador e título da tarefa, quem agiu, o status
/// resultante e o detalhe específico da transição em [`EventKind`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowEvent {
    /// Identificador da tarefa afetada.
    pub task_id: TaskId,
    /// Título da tarefa, para mensagens legíveis.
    pub task_title: String,
    /// Identidade de quem executou a ação.
    pub actor: ActorId,
    /// Status da tarefa após a transição.
    pub status: TaskStatus,
    /// Detalhe da transição.
    #[serde(flatten)]
    pub kind: EventKind,
    /// Momento em que a transição foi confirmada.
    pub at: DateTime<Utc>,
}

impl WorkflowEvent {
    pub fn new(task: &Task, actor: &ActorId, kind: EventKind) -> Self {
        Self {
            task_id: task.id.clone(),
            task_title: task.title.clone(),
            actor: actor.clone(),
            status: task.status,
            kind,
            at: Utc::now(),
        }
    }
}

/// O tipo de transição. Serializado com o campo `"type"` no JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    TaskCreated,
    CreationApproved,
    CreationRejected {
        comments: String,
    },
    WorkStarted,
    CompletionSubmitted {
        assignee: ActorId,
        generation: u64,
    },
    /// Um nível aprovou e a revisão seguiu para o próximo nível.
    ReviewAdvanced {
        assignee: ActorId,
        level: u8,
        next_level: u8,
    },
    /// A cadeia inteira aprovou: a nota efetiva e as contribuições de KPI são emitidas.
    CompletionApproved {
        assignee: ActorId,
        score: f64,
        effective_score: f64,
        kpi_contributions: Vec<KpiContribution>,
    },
    CompletionRejected {
        assignee: ActorId,
        level: u8,
        comments: String,
    },
    PutOnHold {
        reason: String,
    },
    Resumed,
    TaskDeleted,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state_machine::sample_task;

    #[test]
    fn event_kind_uses_type_tag() {
        let task = sample_task();
        let event = WorkflowEvent::new(
            &task,
            &ActorId::new("lead").unwrap(),
            EventKind::CompletionRejected {
                assignee: ActorId::new("dev").unwrap(),
                level: 2,
                comments: "redo sections 2-3".into(),
            },
        );
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "completion_rejected");
        assert_eq!(json["level"], 2);
        assert_eq!(json["actor"], "lead");
        assert_eq!(json["status"], "PendingApproval");
    }

    #[test]
    fn deserialize_from_wire_format() {
        let wire = r#"{
            "task_id": "t-1",
            "task_title": "Ship it",
            "actor": "lead",
            "status": "Completed",
            "type": "completion_approved",
            "assignee": "dev",
            "score": 4.0,
            "effective_score": 32.0,
            "kpi_contributions": [{"kpi_title": "Uptime", "value": 16.0}],
            "at": "2026-10-01T12:00:00Z"
        }"#;
        let event: WorkflowEvent = serde_json::from_str(wire).unwrap();
        assert_eq!(event.status, TaskStatus::Completed);
        match event.kind {
            EventKind::CompletionApproved {
                effective_score,
                kpi_contributions,
                ..
            } => {
                assert_eq!(effective_score, 32.0);
                assert_eq!(kpi_contributions[0].kpi_title, "Uptime");
            }
            other => panic!("unexpected kind {other:?}"),
        }
    }
}
