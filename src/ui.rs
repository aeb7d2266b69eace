//! Saída de terminal do actionline: mensagens coloridas.
//!
//! Usa a crate `console` para estilização com cores. O [`Reporter`] mostra
//! o resultado de cada operação do fluxo e resume tarefas e contadores.

use console::Style;

use actionline::WorkflowError;
use actionline::state_machine::{Assignment, EntryStatus, Task, TaskStatus};
use actionline::stats::TaskStats;

/// Impressor das etapas do fluxo no terminal.
///
/// Exibe mensagens coloridas para sucesso (verde), falha (vermelho)
/// e estados intermediários (amarelo).
pub struct Reporter {
    // Estilo verde para mensagens de sucesso.
    green: Style,
    // Estilo vermelho para mensagens de falha.
    red: Style,
    // Estilo amarelo para estados em andamento.
    yellow: Style,
    // Estilo para títulos de seção.
    header: Style,
}

impl Default for Reporter {
    fn default() -> Self {
        Self {
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
            yellow: Style::new().yellow(),
            header: Style::new().cyan().bold(),
        }
    }
}

impl Reporter {
    /// Imprime um título de seção.
    pub fn section(&self, title: &str) {
        println!();
        println!("{}", self.header.apply_to(format!("─── {title} ───")));
    }

    /// Imprime uma etapa concluída com o status resultante da tarefa.
    pub fn step(&self, label: &str, status: TaskStatus) {
        let style = self.status_style(status);
        println!(
            "  {} {label} → {}",
            self.green.apply_to("✓"),
            style.apply_to(status)
        );
    }

    /// Imprime uma etapa recusada pelo engine, com a guarda que falhou.
    pub fn refused(&self, label: &str, err: &WorkflowError) {
        println!(
            "  {} {label}: {} ({})",
            self.red.apply_to("✗"),
            err.reason(),
            err.kind()
        );
    }

    /// Imprime o estado de uma atribuição e a sua cadeia de aprovação.
    pub fn assignment(&self, assignment: &Assignment) {
        println!(
            "    {} [{}] generation {}",
            assignment.assignee,
            assignment.completion_status,
            assignment.approval_chain.generation
        );
        for entry in &assignment.approval_chain.entries {
            let style = match entry.status {
                EntryStatus::Approved | EntryStatus::Skipped => &self.green,
                EntryStatus::Rejected => &self.red,
                EntryStatus::Pending | EntryStatus::Queued => &self.yellow,
            };
            println!(
                "      L{} {} ({}) {}",
                entry.level,
                entry.approver,
                entry.role,
                style.apply_to(entry.status)
            );
        }
        if let Some(grade) = &assignment.completion_grade {
            println!(
                "      grade {:.1} → effective score {:.2}",
                grade.score, grade.effective_score
            );
        }
        if let Some(rejection) = &assignment.last_rejection {
            println!(
                "      {} L{} {}: {}",
                self.red.apply_to("rejected"),
                rejection.level,
                rejection.reviewer,
                rejection.comments
            );
        }
    }

    /// Imprime o resumo de uma tarefa.
    pub fn task(&self, task: &Task) {
        println!(
            "  {} [{}] {} ({}%)",
            task.title,
            task.priority,
            self.status_style(task.status).apply_to(task.status),
            task.progress()
        );
        for assignment in &task.assignments {
            self.assignment(assignment);
        }
    }

    /// Imprime os contadores do painel.
    pub fn stats(&self, stats: &TaskStats) {
        println!("  total               {}", stats.total);
        println!("  pending creation    {}", stats.pending_creation);
        println!("  pending completion  {}", stats.pending_completion);
        println!("  not started         {}", stats.not_started);
        println!("  in progress         {}", stats.in_progress);
        println!("  on hold             {}", stats.on_hold);
        println!("  completed           {}", self.green.apply_to(stats.completed));
        println!("  rejected            {}", self.red.apply_to(stats.rejected));
    }

    fn status_style(&self, status: TaskStatus) -> &Style {
        match status {
            TaskStatus::Completed => &self.green,
            TaskStatus::Rejected => &self.red,
            _ => &self.yellow,
        }
    }
}
