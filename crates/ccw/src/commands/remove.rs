//! Implementation of the `ccw rm` command

use dialoguer::Confirm;

use ccw_core::RemoveOptions;

use crate::colors::{COLORS, paint};
use crate::commands::build_manager;
use crate::output::{JsonResponse, RemoveData};

/// How a "work would be lost" question gets answered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Answer {
    /// `-y`: always proceed
    Yes,
    /// Ask on the terminal
    Prompt,
    /// No terminal and no `-y`: the removal fails with the safety error
    Refuse,
}

fn answer_mode(yes: bool, json_output: bool, is_term: bool) -> Answer {
    if yes {
        Answer::Yes
    } else if json_output || !is_term {
        Answer::Refuse
    } else {
        Answer::Prompt
    }
}

/// Show the reason and differing files, then ask on stderr
fn prompt(reason: &str, files: &[String]) -> bool {
    eprintln!("{} {}", paint("warning:", COLORS.warning), reason);
    if !files.is_empty() {
        eprintln!("Files that differ:");
        for file in files {
            eprintln!("  {}", file);
        }
    }

    match Confirm::new()
        .with_prompt("Delete anyway?")
        .default(false)
        .interact()
    {
        Ok(answer) => answer,
        Err(e) => {
            log::warn!("confirmation prompt failed: {}", e);
            false
        }
    }
}

fn always_yes(_reason: &str, _files: &[String]) -> bool {
    true
}

/// Run the rm command
pub fn run_remove(
    workspace: String,
    force: bool,
    keep_branch: bool,
    keep_worktree: bool,
    yes: bool,
    json_output: bool,
    quiet: bool,
) -> anyhow::Result<i32> {
    let manager = build_manager(json_output)?;

    let is_term = console::Term::stderr().is_term();
    let prompt_fn: &dyn Fn(&str, &[String]) -> bool = &prompt;
    let yes_fn: &dyn Fn(&str, &[String]) -> bool = &always_yes;
    let confirm = match answer_mode(yes, json_output, is_term) {
        Answer::Yes => Some(yes_fn),
        Answer::Prompt => Some(prompt_fn),
        Answer::Refuse => None,
    };

    let opts = RemoveOptions {
        force,
        keep_branch,
        keep_worktree,
        confirm,
    };
    let id = manager.remove(&workspace, &opts)?;

    if json_output {
        JsonResponse::ok("rm", RemoveData { id }).print()?;
    } else if !quiet {
        println!("removed workspace {}", id);
    }

    Ok(0)
}
