//! Configuração do engine carregada a partir de `actionline.toml`.
//!
//! A struct [`EngineConfig`] contém os limites de validação e os parâmetros
//! de notificação. Valores não presentes no arquivo usam defaults sensíveis.
//! A variável de ambiente `ACTIONLINE_WEBHOOK_URL` tem precedência sobre o arquivo.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

const DEFAULT_CONFIG_FILE: &str = "actionline.toml";
const WEBHOOK_ENV: &str = "ACTIONLINE_WEBHOOK_URL";

/// Configuração de nível superior carregada de `actionline.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Tamanho mínimo (em caracteres) das notas de conclusão.
    #[serde(default = "default_min_completion_notes")]
    pub min_completion_notes: usize,

    /// Tamanho mínimo do comentário de rejeição no nível 1 e na criação.
    #[serde(default = "default_min_rejection_comment")]
    pub min_rejection_comment: usize,

    /// Tamanho mínimo do comentário de rejeição nos níveis 2 e 3.
    #[serde(default = "default_min_late_rejection_comment")]
    pub min_late_rejection_comment: usize,

    /// Tempo máximo para entregar uma notificação, em milissegundos.
    #[serde(default = "default_notify_timeout_ms")]
    pub notify_timeout_ms: u64,

    /// Endpoint HTTP que recebe os eventos. Sem ele, eventos vão apenas para o log.
    #[serde(default)]
    pub webhook_url: Option<String>,
}

// Valor padrão para as notas de conclusão: 20 caracteres.
fn default_min_completion_notes() -> usize {
    20
}

// Valor padrão para rejeição no nível 1: 10 caracteres.
fn default_min_rejection_comment() -> usize {
    10
}

// Valor padrão para rejeição nos níveis 2 e 3: 20 caracteres.
fn default_min_late_rejection_comment() -> usize {
    20
}

// Valor padrão para o timeout de notificação: 5000ms.
fn default_notify_timeout_ms() -> u64 {
    5000
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_completion_notes: default_min_completion_notes(),
            min_rejection_comment: default_min_rejection_comment(),
            min_late_rejection_comment: default_min_late_rejection_comment(),
            notify_timeout_ms: default_notify_timeout_ms(),
            webhook_url: None,
        }
    }
}

impl EngineConfig {
    /// Carrega a configuração de `actionline.toml` no diretório atual.
    /// Usa valores padrão se o arquivo não existir.
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new(DEFAULT_CONFIG_FILE))
    }

    /// Carrega a configuração de um caminho explícito.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            toml::from_str::<EngineConfig>(&contents)
                .with_context(|| format!("failed to parse {}", path.display()))?
        } else {
            Self::default()
        };

        // Variável de ambiente tem precedência sobre o arquivo de configuração.
        if let Ok(url) = std::env::var(WEBHOOK_ENV) {
            if !url.is_empty() {
                config.webhook_url = Some(url);
            }
        }

        Ok(config)
    }

    /// Comentário mínimo exigido para rejeitar no nível informado.
    pub fn min_rejection_for_level(&self, level: u8) -> usize {
        if level >= 2 {
            self.min_late_rejection_comment
        } else {
            self.min_rejection_comment
        }
    }

    pub fn notify_timeout(&self) -> Duration {
        Duration::from_millis(self.notify_timeout_ms)
    }
}
