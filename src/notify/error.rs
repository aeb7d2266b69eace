//! Tipos de erro para a entrega de notificações.
//!
//! Define [`NotifyError`] com variantes para respostas rejeitadas, timeout
//! e erros de rede. Nenhuma delas desfaz a transição que gerou o evento:
//! o engine apenas registra a falha no log.

use thiserror::Error;

/// Erros que podem ocorrer ao entregar um evento de workflow.
///
/// - [`Rejected`](NotifyError::Rejected): o endpoint respondeu com status fora de 2xx
/// - [`Timeout`](NotifyError::Timeout): a entrega excedeu o tempo configurado
/// - [`Network`](NotifyError::Network): falha na camada de rede
#[derive(Debug, Error)]
pub enum NotifyError {
    /// O endpoint respondeu com um status de erro.
    #[error("notification endpoint returned status {status}: {message}")]
    Rejected { status: u16, message: String },

    /// A entrega não terminou dentro do prazo.
    #[error("notification timed out after {0}ms")]
    Timeout(u64),

    /// Falha de rede subjacente (DNS, conexão recusada).
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}
