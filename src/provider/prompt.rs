use crate::types::History;

/// Instruction template shared by every family.
pub(crate) const INSTRUCTION_HEADER: &str = "### Instruction:\n";
pub(crate) const INPUT_HEADER: &str = "### Input:\n";
pub(crate) const RESPONSE_HEADER: &str = "### Response:\n";

/// Build the model prompt for one request, prior exchanges first.
///
/// An empty instruction promotes the input to the instruction slot, which is
/// how the chat demo calls in.
pub fn build_prompt(instruction: &str, input: &str, history: &History) -> String {
    let mut prompt = String::new();

    for exchange in history.exchanges() {
        prompt.push_str(INSTRUCTION_HEADER);
        prompt.push_str(&exchange.user);
        prompt.push('\n');
        prompt.push_str(RESPONSE_HEADER);
        prompt.push_str(&exchange.bot);
        prompt.push_str("\n\n");
    }

    let (instruction, input) = if instruction.trim().is_empty() {
        (input, "")
    } else {
        (instruction, input)
    };

    prompt.push_str(INSTRUCTION_HEADER);
    prompt.push_str(instruction);
    prompt.push('\n');
    if !input.is_empty() {
        prompt.push_str(INPUT_HEADER);
        prompt.push_str(input);
        prompt.push('\n');
    }
    prompt.push_str(RESPONSE_HEADER);
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_instruction_only() {
        assert_eq!(
            build_prompt("Translate: hi", "", &History::new()),
            "### Instruction:\nTranslate: hi\n### Response:\n"
        );
    }

    #[test]
    fn test_instruction_with_input() {
        assert_eq!(
            build_prompt("Summarize", "a long text", &History::new()),
            "### Instruction:\nSummarize\n### Input:\na long text\n### Response:\n"
        );
    }

    #[test]
    fn test_chat_turn_with_history() {
        let mut history = History::new();
        history.push("hi", "hello!");
        assert_eq!(
            build_prompt("", "what is rust?", &history),
            "### Instruction:\nhi\n### Response:\nhello!\n\n\
             ### Instruction:\nwhat is rust?\n### Response:\n"
        );
    }
}
