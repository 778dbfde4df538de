// question.rs — Pending-question subcommands: ask, answer, show.

use clap::Subcommand;
use tb_dispatch::EngineConfig;

use super::open_engine;

#[derive(Subcommand)]
pub enum QuestionCommands {
    /// Raise a mandatory question; all other events block until answered.
    Ask {
        /// The question text.
        question: String,
        /// The tool whose invocation counts as the answer.
        #[arg(long, default_value = "answer_question")]
        answer_tool: String,
    },
    /// Clear the pending question (answered out of band).
    Answer,
    /// Show the pending question, if any.
    Show,
}

pub fn execute(cmd: &QuestionCommands, config: &EngineConfig) -> anyhow::Result<()> {
    let engine = open_engine(config)?;

    match cmd {
        QuestionCommands::Ask {
            question,
            answer_tool,
        } => {
            let pending = engine.ask_question(question, answer_tool)?;
            println!(
                "Question raised; everything blocks until '{}' is invoked.",
                pending.answer_tool
            );
        }

        QuestionCommands::Answer => match engine.answer_question()? {
            Some(q) => println!(
                "Question cleared after {} violation(s): \"{}\"",
                q.violation_count, q.question
            ),
            None => println!("No question is pending."),
        },

        QuestionCommands::Show => match engine.pending_question() {
            Some(q) => {
                println!("Question:    {}", q.question);
                println!("Answer tool: {}", q.answer_tool);
                println!("Asked at:    {}", q.asked_at.format("%Y-%m-%d %H:%M:%S"));
                println!("Violations:  {}", q.violation_count);
            }
            None => println!("No question is pending."),
        },
    }

    Ok(())
}
