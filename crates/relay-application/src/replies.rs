//! User-facing reply text builders.
//!
//! Every string the engine sends back through WhatsApp is assembled here, so
//! tone and formatting stay in one place. WhatsApp renders `*bold*`.

use crate::commands::builtin_commands;
use relay_core::incident::Incident;
use relay_core::reference;
use relay_core::session::TaskRef;

pub fn help_text() -> String {
    let mut out = String::from("*Available commands*\n");
    for command in builtin_commands() {
        out.push_str(&format!("{} - {}\n", command.usage, command.description));
    }
    out.push_str(
        "\nYou can also send a task code (like #A1B2C3) to see its details, \
         or describe a problem in your own words to report it.",
    );
    out
}

pub fn task_list(tasks: &[TaskRef]) -> String {
    let mut out = String::from("*Your open tasks*\n");
    for (index, task) in tasks.iter().enumerate() {
        out.push_str(&format!(
            "{}. {} ({})\n",
            index + 1,
            task.description,
            task.status.label()
        ));
    }
    out.push_str("\nReply with the number of the task you want, or *cancel*.");
    out
}

pub fn select_reprompt(count: usize) -> String {
    format!(
        "Please reply with a number between 1 and {count}, or *cancel* to stop."
    )
}

pub fn provide_update_prompt(task: &TaskRef) -> String {
    format!(
        "You picked: {}\n\nSend a short progress note, reply *complete* to mark it done, \
         or *cancel* to stop.",
        task.description
    )
}

pub fn confirm_prompt(task: &TaskRef) -> String {
    format!(
        "Mark \"{}\" as resolved?\n\nReply *yes* to confirm, *no* to keep working on it.",
        task.description
    )
}

pub fn confirm_reprompt() -> String {
    "Please reply *yes* to confirm completion, *no* to continue updating, or *cancel* to stop."
        .to_string()
}

pub fn update_recorded(record_id: &str, advanced: bool) -> String {
    let code = reference::encode(record_id);
    if advanced {
        format!("Progress noted on {code}; the task is now marked in progress. Thank you!")
    } else {
        format!("Progress noted on {code}. Thank you!")
    }
}

pub fn completion_recorded(record_id: &str) -> String {
    format!(
        "{} is now marked resolved. Thanks for closing it out!",
        reference::encode(record_id)
    )
}

pub fn resume_update(task: &TaskRef) -> String {
    format!(
        "Okay, continuing with \"{}\". Send a progress note, *complete*, or *cancel*.",
        task.description
    )
}

pub fn cancel_ack() -> String {
    "Cancelled. Nothing was changed.".to_string()
}

pub fn start_over() -> String {
    "That conversation has expired. Please start over (send /help to see commands)."
        .to_string()
}

pub fn no_open_tasks() -> String {
    "You have no open tasks right now.".to_string()
}

pub fn assigned_list(incidents: &[Incident]) -> String {
    let mut out = String::from("*Assigned to you*\n");
    for incident in incidents {
        out.push_str(&format!(
            "{} {} ({})\n",
            reference::encode(&incident.id),
            incident.description,
            incident.status.label()
        ));
    }
    out.push_str("\nSend a code to see details, or /update to record progress.");
    out
}

pub fn status_summary(open: usize, in_progress: usize, reported: usize) -> String {
    format!(
        "*Your status*\nAssigned open: {open}\nAssigned in progress: {in_progress}\n\
         Reported by you: {reported}\n\nSend /assigned for the full list."
    )
}

pub fn detail_view(incident: &Incident) -> String {
    let code = reference::encode(&incident.id);
    let mut out = format!(
        "*{code}* - {}\nStatus: {}\nCategory: {}\n",
        incident.description,
        incident.status.label(),
        incident.category.name
    );
    if let Some(location) = &incident.location {
        out.push_str(&format!("Location: {location}\n"));
    }
    out.push_str(&format!(
        "Reported: {}\n",
        incident.reported_at.format("%Y-%m-%d %H:%M UTC")
    ));
    if let Some(note) = incident.notes.last() {
        out.push_str(&format!("Latest note: {}\n", note.body));
    }
    if incident.status.is_open() {
        out.push_str(&format!(
            "\nNext: /update {code} <note> or /complete {code} <note>"
        ));
    }
    out
}

pub fn unknown_reference(code: &str) -> String {
    format!(
        "Couldn't find a task for {code}. Check the code, or send /assigned to list \
         your tasks."
    )
}

pub fn invalid_position(count: usize) -> String {
    if count == 0 {
        no_open_tasks()
    } else {
        format!(
            "That task number doesn't match your list; you currently have {count} open \
             task(s). Send /update to see them numbered."
        )
    }
}

pub fn invalid_identifier() -> String {
    "I couldn't tell which task you meant. Use the task number from /update or a code \
     like #A1B2C3."
        .to_string()
}

pub fn report_ack(record_id: &str) -> String {
    let code = reference::encode(record_id);
    format!(
        "Thanks, your report is logged as {code}. Send {code} anytime to check on it."
    )
}

pub fn caption_needed() -> String {
    "Got the photo! Please resend it with a short caption describing the problem so it \
     can be logged."
        .to_string()
}

pub fn location_hint() -> String {
    "Thanks for the location. Please also describe the problem in a message so it can \
     be logged."
        .to_string()
}

pub fn unsupported_hint() -> String {
    "Sorry, that message type isn't supported yet. Please describe the problem in a \
     text message, or send /help."
        .to_string()
}

/// Prompt sent to the generative backend for free-text intake triage.
pub fn parse_prompt(display_name: &str, text: &str) -> String {
    format!(
        "A school staff member named {display_name} reported the following issue over \
         chat. Summarize it in one sentence and suggest a category \
         (maintenance, electrical, plumbing, cleaning, safety, security, technology \
         or general).\n\nReport: {text}"
    )
}
