//! The status line shown below the prompt: what the line addresses and
//! which parameters are used, in use or still free.
use crate::command::{Command, Parameter, Value, ValueType};
use crate::state::ParsingState;
use crate::styles::{
    StyledText, ARGUMENT_NAME, BRACKET, COMMAND_NAME, COMMAND_TYPE, ELLIPSIS, ERROR, MULTICOMMAND_METAVAR,
    MULTICOMMAND_NAME, MULTICOMMAND_TYPE, NARGS, OPTION_NAME, SPACE, SYMBOL, TYPE_DESCRIPTOR, USAGE_INUSE,
    USAGE_UNUSED, USAGE_USED,
};

#[derive(Debug, Clone, Copy, PartialEq)]
enum Usage {
    InUse,
    Used,
    Unused,
}

impl Usage {
    fn tag(self) -> &'static str {
        match self {
            Usage::InUse => USAGE_INUSE,
            Usage::Used => USAGE_USED,
            Usage::Unused => USAGE_UNUSED,
        }
    }
}

fn tagged(tag: &str, usage: Usage) -> String {
    format!("{},{}", tag, usage.tag())
}

pub fn render(state: &ParsingState, show_hidden_params: bool) -> StyledText {
    let command = match &state.current_command {
        Some(command) => command,
        None => return render_group(&state.current_group),
    };

    let mut text = StyledText::new();
    if command.is_group() {
        text.push(MULTICOMMAND_TYPE, group_kind(command));
        text.push(SPACE, " ");
        text.push(MULTICOMMAND_NAME, &command.name);
    } else {
        text.push(COMMAND_TYPE, "Command");
        text.push(SPACE, " ");
        text.push(COMMAND_NAME, &command.name);
    }

    let mut params = Vec::new();
    for (i, param) in command.params.iter().enumerate() {
        let current = state.current_param == Some(i);
        if param.hidden && !(current && show_hidden_params) {
            continue;
        }

        params.push(render_param(state, param, current));
    }

    if !params.is_empty() {
        text.push(SYMBOL, ":");
        text.push(SPACE, " ");
        for (i, param) in params.into_iter().enumerate() {
            if i > 0 {
                text.push(SPACE, " ");
            }
            text.extend(param);
        }
    }

    text
}

pub fn render_error(message: &str) -> StyledText {
    StyledText::plain(ERROR, message)
}

fn group_kind(group: &Command) -> &'static str {
    if group.is_chain() {
        "ChainedGroup"
    } else {
        "Group"
    }
}

fn render_group(group: &Command) -> StyledText {
    let mut text = StyledText::new();
    text.push(MULTICOMMAND_TYPE, group_kind(group));
    text.push(SPACE, " ");
    text.push(MULTICOMMAND_NAME, &group.name);
    if group.list_commands().is_empty() {
        return text;
    }

    text.push(SYMBOL, ":");
    text.push(SPACE, " ");
    if group.is_chain() {
        push_command_metavar(&mut text, "COMMAND1");
        text.push(SPACE, " ");
        text.push(BRACKET, "[");
        push_command_metavar(&mut text, "COMMAND2");
        text.push(BRACKET, "]");
        text.push(ELLIPSIS, "...");
    } else {
        push_command_metavar(&mut text, "COMMAND");
    }

    text
}

/// `NAME [ARGS]...`
fn push_command_metavar(text: &mut StyledText, name: &str) {
    text.push(MULTICOMMAND_METAVAR, name);
    text.push(SPACE, " ");
    text.push(BRACKET, "[");
    text.push(MULTICOMMAND_METAVAR, "ARGS");
    text.push(BRACKET, "]");
    text.push(ELLIPSIS, "...");
}

fn usage_of(state: &ParsingState, param: &Parameter, current: bool) -> Usage {
    // Counters and multiple options can always be given again.
    if param.is_count() || param.multiple {
        Usage::Unused
    } else if current {
        Usage::InUse
    } else if !state.current_ctx.is_param_incomplete(param, true) {
        Usage::Used
    } else {
        Usage::Unused
    }
}

fn render_param(state: &ParsingState, param: &Parameter, current: bool) -> StyledText {
    let usage = usage_of(state, param, current);
    let name_tag = if param.is_argument() { ARGUMENT_NAME } else { OPTION_NAME };
    let mut text = StyledText::plain(&tagged(name_tag, usage), &param.name.replace('_', "-"));
    if !current {
        return text;
    }

    let value = state.current_ctx.value(&param.name).unwrap_or(&Value::Missing);
    if let ValueType::Tuple(types) = &param.value_type {
        text.push(&tagged(BRACKET, usage), "(");
        text.extend(tuple_info(types, value));
        text.push(&tagged(BRACKET, usage), ")");
        return text;
    }

    let type_usage = if state.current_ctx.is_param_incomplete(param, true) {
        Usage::InUse
    } else {
        Usage::Used
    };
    let type_info = type_info(&param.value_type, type_usage);
    match param.nargs {
        1 => {
            if !type_info.is_empty() {
                text.push(SPACE, " ");
                text.extend(type_info);
            }
        }
        -1 => {
            text.push(SPACE, " ");
            if !type_info.is_empty() {
                text.extend(type_info);
                text.push(&tagged(SPACE, usage), " ");
            }
            text.push(&tagged(ELLIPSIS, usage), "...");
        }
        nargs => {
            text.push(SPACE, " ");
            if !type_info.is_empty() {
                text.extend(type_info);
            }
            let received = filled_slots(value).into_iter().filter(|filled| *filled).count();
            text.push(&tagged(SYMBOL, usage), "(");
            text.push(&tagged(NARGS, usage), &received.to_string());
            text.push(&tagged(SYMBOL, usage), "/");
            text.push(&tagged(NARGS, usage), &nargs.to_string());
            text.push(&tagged(SYMBOL, usage), ")");
        }
    }

    text
}

/// `<metavar>`, or nothing for plain text types.
fn type_info(value_type: &ValueType, usage: Usage) -> StyledText {
    let mut text = StyledText::new();
    match value_type {
        ValueType::String | ValueType::Unprocessed => (),
        _ => {
            text.push(&tagged(BRACKET, usage), "<");
            text.push(&tagged(TYPE_DESCRIPTOR, usage), &value_type.metavar());
            text.push(&tagged(BRACKET, usage), ">");
        }
    }
    text
}

/// One `<metavar>` per slot. Filled slots are used and the first empty one
/// is in use.
fn tuple_info(types: &[ValueType], value: &Value) -> StyledText {
    let filled = filled_slots(value);
    let mut found_current = false;
    let mut text = StyledText::new();
    for (i, slot_type) in types.iter().enumerate() {
        let usage = if filled.get(i).cloned().unwrap_or(false) {
            Usage::Used
        } else if !found_current {
            found_current = true;
            Usage::InUse
        } else {
            Usage::Unused
        };

        if i > 0 {
            text.push(SPACE, " ");
        }
        text.push(&tagged(BRACKET, usage), "<");
        text.push(&tagged(TYPE_DESCRIPTOR, usage), &slot_type.metavar());
        text.push(&tagged(BRACKET, usage), ">");
    }
    text
}

/// Which slots of a fixed-size value have been typed. For a `multiple`
/// option the last occurrence counts.
fn filled_slots(value: &Value) -> Vec<bool> {
    match value {
        Value::Tuple(values) => values.iter().map(|value| !value.is_missing()).collect(),
        Value::List(values) => values.last().map(filled_slots).unwrap_or_default(),
        _ => Vec::new(),
    }
}
