//! Interface de linha de comando do actionline baseada em clap.
//!
//! Define a struct [`Cli`] com subcomandos [`Command`] (score, stats, demo)
//! e flags globais (--config, --verbose).

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// actionline: engine de ciclo de vida e aprovação de action items.
#[derive(Debug, Parser)]
#[command(name = "actionline", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Caminho para o arquivo de configuração (padrão: actionline.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Habilita saída detalhada (verbose).
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Calcula a nota efetiva de uma nota bruta e do peso da tarefa.
    Score {
        /// Nota atribuída pelo revisor de nível 1 (1.0 a 5.0).
        #[arg(long)]
        grade: f64,

        /// Peso percentual da tarefa no marco (0 a 100).
        #[arg(long)]
        weight: f64,
    },

    /// Mostra os contadores do painel a partir de um arquivo JSON de tarefas.
    Stats {
        /// Caminho para um arquivo JSON contendo uma lista de tarefas.
        #[arg(long)]
        file: PathBuf,
    },

    /// Executa a demonstração embutida do fluxo de aprovação em três níveis.
    Demo,
}
