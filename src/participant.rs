//! Terminal prompt for the participant identity.

use std::io::{BufRead, Write};

use anyhow::{Result, bail};
use chrono::{DateTime, Local};
use recall_core::ParticipantInfo;

const NAME_PROMPT: &str = "参加者名を入力してください: ";

fn read_line<R: BufRead>(input: &mut R) -> Result<String> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        bail!("input closed before a participant name was given");
    }
    Ok(line)
}

fn accepts(answer: &str) -> bool {
    matches!(
        answer.trim().to_lowercase().as_str(),
        "" | "y" | "yes" | "はい"
    )
}

/// Asks for a name; an empty answer offers a timestamped identity instead,
/// and declining it asks again.
pub fn prompt_participant<R, W>(
    input: &mut R,
    output: &mut W,
    now: impl Fn() -> DateTime<Local>,
) -> Result<ParticipantInfo>
where
    R: BufRead,
    W: Write,
{
    loop {
        write!(output, "{NAME_PROMPT}")?;
        output.flush()?;
        if let Some(participant) = ParticipantInfo::named(&read_line(input)?) {
            return Ok(participant);
        }

        let generated = ParticipantInfo::generated(now());
        write!(
            output,
            "参加者名が空です。{} を使用しますか? [Y/n]: ",
            generated.name
        )?;
        output.flush()?;
        if accepts(&read_line(input)?) {
            return Ok(generated);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::io::Cursor;

    fn at() -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 2, 3, 14, 5, 9).unwrap()
    }

    fn run(script: &str) -> (Result<ParticipantInfo>, String) {
        let mut input = Cursor::new(script.as_bytes().to_vec());
        let mut output = Vec::new();
        let result = prompt_participant(&mut input, &mut output, at);
        (result, String::from_utf8(output).unwrap())
    }

    #[test]
    fn typed_name_is_trimmed() {
        let (result, output) = run("  Sato  \n");
        assert_eq!(result.unwrap().name, "Sato");
        assert_eq!(output, NAME_PROMPT);
    }

    #[test]
    fn empty_name_defaults_to_generated_identity() {
        let (result, output) = run("\n\n");
        assert_eq!(result.unwrap().name, "Participant_20260203_140509");
        assert!(output.contains("Participant_20260203_140509 を使用しますか"));
    }

    #[test]
    fn declining_asks_again() {
        let (result, output) = run("\nn\nSuzuki\n");
        assert_eq!(result.unwrap().name, "Suzuki");
        assert_eq!(output.matches(NAME_PROMPT).count(), 2);
    }

    #[test]
    fn closed_input_is_an_error() {
        let (result, _) = run("\nno\n");
        assert!(result.is_err());
    }
}
