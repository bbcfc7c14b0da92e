//! AT command lexer. Splits one DTE line into an ordered list of discrete
//! sub-commands, or rejects the whole line atomically.
//!
//! The opcode-to-operand-alphabet table lives here as plain match arms
//! rather than a literal static table — the alphabets are all "optional
//! single digit from a small set", so a table of closures would just be
//! this code wearing a costume.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialForm {
    /// `DT`/`DP` — phonebook lookup by sanitized number.
    PhonebookNumber(String),
    /// `DH` — direct TELNET to `host:port`.
    Host(String),
    /// `DE` — direct SSH, `host|user|pass`.
    Ssh { host: String, user: String, pass: String },
    /// `DS<n>` — dial the number stored in phonebook slot `n`.
    Stored(u8),
    /// `DL` — redial the last accepted dial command.
    Last,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialCommand {
    pub form: DialForm,
    /// `;` appeared anywhere in the original (pre-modifier-stripping)
    /// payload: stay in COMMAND mode on success instead of entering DATA.
    pub stay_in_command_mode: bool,
    /// The raw payload following `D`, exactly as typed (mode letter plus
    /// unstripped body) — what gets remembered as "last dialed" for `DL`.
    pub raw: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmperSub {
    DcdControl(u8),
    FactoryReset,
    DumpProfile,
    WriteActive(u8),
    SetPowerUp(u8),
    /// `(added)` — spec.md §4.6 names `&D`/`&S` as dispatcher
    /// responsibilities the original source never implemented a body for.
    Dtr(u8),
    DsrPinned(u8),
    NoOp(char),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubCommand {
    Attach,
    Hook(bool),
    Echo(bool),
    Quiet(bool),
    Verbose(bool),
    Reset(u8),
    SpeakerVolume(u8),
    SpeakerMode(u8),
    ConnectMsgSpeed(u8),
    ExtendedResultStyle(u8),
    Info(u8),
    Online,
    Dial(DialCommand),
    RegQuerySelected,
    RegWrite(usize, u16),
    RegQuery(usize),
    RegSelect(usize),
    AmperZ { slot: u8, spec: String },
    Amper(AmperSub),
    Debug(String),
    /// Faked-out opcodes (`B`,`C`,`N`,`P`,`T`,`Y` as a bare top-level
    /// command) that real Hayes modems accept and silently ignore.
    NoOp(char),
}

/// Lex `line` into an ordered sub-command list. `Err(())` means the whole
/// line is rejected — no partial results, no side effects.
pub fn parse_line(line: &str) -> Result<Vec<SubCommand>, ()> {
    if line.len() < 2 || !line[..2].eq_ignore_ascii_case("at") {
        return Err(());
    }
    let payload: Vec<char> = line[2..].chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < payload.len() {
        let c = payload[i].to_ascii_uppercase();
        i += 1;
        match c {
            'A' => {
                consume_operand(&payload, &mut i, &[0])?;
                tokens.push(SubCommand::Attach);
            }
            'H' => {
                let op = consume_operand(&payload, &mut i, &[0, 1])?;
                tokens.push(SubCommand::Hook(op == 1));
            }
            'E' => {
                let op = consume_operand(&payload, &mut i, &[0, 1])?;
                tokens.push(SubCommand::Echo(op == 1));
            }
            'Q' => {
                let op = consume_operand(&payload, &mut i, &[0, 1])?;
                tokens.push(SubCommand::Quiet(op == 1));
            }
            'V' => {
                let op = consume_operand(&payload, &mut i, &[0, 1])?;
                tokens.push(SubCommand::Verbose(op == 1));
            }
            'Z' => {
                let op = consume_operand(&payload, &mut i, &[0, 1])?;
                tokens.push(SubCommand::Reset(op));
            }
            'L' => {
                let op = consume_operand(&payload, &mut i, &[0, 1, 2, 3])?;
                tokens.push(SubCommand::SpeakerVolume(op));
            }
            'M' => {
                let op = consume_operand(&payload, &mut i, &[0, 1, 2])?;
                tokens.push(SubCommand::SpeakerMode(op));
            }
            'W' => {
                let op = consume_operand(&payload, &mut i, &[0, 1, 2])?;
                tokens.push(SubCommand::ConnectMsgSpeed(op));
            }
            'X' => {
                let op = consume_operand(&payload, &mut i, &[0, 1, 2, 3, 4, 5, 6, 7])?;
                tokens.push(SubCommand::ExtendedResultStyle(op));
            }
            'I' => {
                let op = consume_operand(&payload, &mut i, &[0, 1, 2, 3, 4, 5])?;
                tokens.push(SubCommand::Info(op));
            }
            'O' => tokens.push(SubCommand::Online),
            'P' | 'T' => {
                consume_operand(&payload, &mut i, &[0])?;
                tokens.push(SubCommand::NoOp(c));
            }
            'B' | 'C' | 'N' | 'Y' => {
                consume_operand(&payload, &mut i, &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9])?;
                tokens.push(SubCommand::NoOp(c));
            }
            'D' => {
                let rest: String = payload[i..].iter().collect();
                tokens.push(SubCommand::Dial(parse_dial(&rest)?));
                i = payload.len();
            }
            'S' => {
                tokens.push(parse_register(&payload, &mut i)?);
            }
            '&' => {
                tokens.push(parse_amper(&payload, &mut i)?);
            }
            '*' => {
                let rest: String = payload[i..].iter().collect();
                tokens.push(SubCommand::Debug(rest));
                i = payload.len();
            }
            _ => return Err(()),
        }
    }
    Ok(tokens)
}

fn consume_operand(chars: &[char], i: &mut usize, allowed: &[u8]) -> Result<u8, ()> {
    if *i < chars.len() && chars[*i].is_ascii_digit() {
        let d = chars[*i] as u8 - b'0';
        if allowed.contains(&d) {
            *i += 1;
            Ok(d)
        } else {
            Err(())
        }
    } else {
        Ok(0)
    }
}

fn consume_digits(chars: &[char], i: &mut usize) -> Option<String> {
    let start = *i;
    while *i < chars.len() && chars[*i].is_ascii_digit() {
        *i += 1;
    }
    if *i == start {
        None
    } else {
        Some(chars[start..*i].iter().collect())
    }
}

fn parse_register(chars: &[char], i: &mut usize) -> Result<SubCommand, ()> {
    if *i < chars.len() && chars[*i] == '?' {
        *i += 1;
        return Ok(SubCommand::RegQuerySelected);
    }
    let n: usize = consume_digits(chars, i).ok_or(())?.parse().map_err(|_| ())?;
    if *i < chars.len() && chars[*i] == '=' {
        *i += 1;
        let v: u32 = consume_digits(chars, i).ok_or(())?.parse().map_err(|_| ())?;
        if v > 65535 {
            return Err(());
        }
        return Ok(SubCommand::RegWrite(n, v as u16));
    }
    if *i < chars.len() && chars[*i] == '?' {
        *i += 1;
        return Ok(SubCommand::RegQuery(n));
    }
    Ok(SubCommand::RegSelect(n))
}

fn parse_amper(chars: &[char], i: &mut usize) -> Result<SubCommand, ()> {
    if *i >= chars.len() {
        return Err(());
    }
    let sub = chars[*i].to_ascii_uppercase();
    *i += 1;
    match sub {
        'C' => Ok(SubCommand::Amper(AmperSub::DcdControl(consume_operand(
            chars,
            i,
            &[0, 1],
        )?))),
        'F' => {
            consume_operand(chars, i, &[0])?;
            Ok(SubCommand::Amper(AmperSub::FactoryReset))
        }
        'V' => {
            consume_operand(chars, i, &[0])?;
            Ok(SubCommand::Amper(AmperSub::DumpProfile))
        }
        'W' => Ok(SubCommand::Amper(AmperSub::WriteActive(consume_operand(
            chars,
            i,
            &[0, 1],
        )?))),
        'Y' => Ok(SubCommand::Amper(AmperSub::SetPowerUp(consume_operand(
            chars,
            i,
            &[0, 1],
        )?))),
        'D' => Ok(SubCommand::Amper(AmperSub::Dtr(consume_operand(
            chars,
            i,
            &[0, 1, 2, 3],
        )?))),
        'S' => Ok(SubCommand::Amper(AmperSub::DsrPinned(consume_operand(
            chars,
            i,
            &[0, 1],
        )?))),
        'Z' => {
            let slot: u8 = consume_digits(chars, i).ok_or(())?.parse().map_err(|_| ())?;
            if *i >= chars.len() || chars[*i] != '=' {
                return Err(());
            }
            *i += 1;
            let spec: String = chars[*i..].iter().collect();
            *i = chars.len();
            Ok(SubCommand::AmperZ { slot, spec })
        }
        'A' | 'B' | 'G' | 'J' | 'K' | 'L' | 'M' | 'O' | 'Q' | 'R' | 'T' | 'U' | 'X' => {
            consume_operand(chars, i, &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9])?;
            Ok(SubCommand::Amper(AmperSub::NoOp(sub)))
        }
        _ => Err(()),
    }
}

const DIAL_MODIFIERS: &[char] = &[',', '@', 'w', 'W', '!'];

fn strip_modifiers(s: &str) -> String {
    s.chars().filter(|c| !DIAL_MODIFIERS.contains(c)).collect()
}

fn parse_dial(rest: &str) -> Result<DialCommand, ()> {
    let mut chars = rest.chars();
    let mode = chars.next().ok_or(())?;
    let payload: String = chars.collect();
    let stay_in_command_mode = payload.contains(';');
    let clean = strip_modifiers(&payload).replace(';', "");

    let form = match mode.to_ascii_uppercase() {
        'L' => DialForm::Last,
        'S' => DialForm::Stored(clean.trim().parse().map_err(|_| ())?),
        'H' => DialForm::Host(clean.trim().to_string()),
        'E' => {
            let fields: Vec<&str> = clean.split('|').collect();
            if fields.len() != 3 {
                return Err(());
            }
            DialForm::Ssh {
                host: fields[0].to_string(),
                user: fields[1].to_string(),
                pass: fields[2].to_string(),
            }
        }
        'T' | 'P' => DialForm::PhonebookNumber(clean.trim().to_string()),
        _ => return Err(()),
    };

    Ok(DialCommand {
        form,
        stay_in_command_mode,
        raw: rest.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_at_yields_empty_token_list() {
        assert_eq!(parse_line("AT").unwrap(), vec![]);
        assert_eq!(parse_line("at").unwrap(), vec![]);
    }

    #[test]
    fn missing_at_prefix_is_rejected() {
        assert!(parse_line("DT5551212").is_err());
    }

    #[test]
    fn missing_operand_defaults_to_zero() {
        assert_eq!(parse_line("ATE").unwrap(), vec![SubCommand::Echo(false)]);
    }

    #[test]
    fn invalid_operand_rejects_whole_line() {
        assert!(parse_line("ATE9Q0").is_err());
    }

    #[test]
    fn multiple_subcommands_in_order() {
        let tokens = parse_line("ATZ0E0H0").unwrap();
        assert_eq!(
            tokens,
            vec![
                SubCommand::Reset(0),
                SubCommand::Echo(false),
                SubCommand::Hook(false),
            ]
        );
    }

    #[test]
    fn register_sublexer_forms() {
        assert_eq!(parse_line("ATS?").unwrap(), vec![SubCommand::RegQuerySelected]);
        assert_eq!(parse_line("ATS6=2").unwrap(), vec![SubCommand::RegWrite(6, 2)]);
        assert_eq!(parse_line("ATS6?").unwrap(), vec![SubCommand::RegQuery(6)]);
        assert_eq!(parse_line("ATS6").unwrap(), vec![SubCommand::RegSelect(6)]);
    }

    #[test]
    fn dial_phonebook_number() {
        let tokens = parse_line("ATDT5551212").unwrap();
        match &tokens[0] {
            SubCommand::Dial(d) => {
                assert_eq!(d.form, DialForm::PhonebookNumber("5551212".to_string()));
                assert!(!d.stay_in_command_mode);
            }
            _ => panic!("expected dial"),
        }
    }

    #[test]
    fn dial_semicolon_detected_before_stripping() {
        let tokens = parse_line("ATDT5551212;").unwrap();
        match &tokens[0] {
            SubCommand::Dial(d) => assert!(d.stay_in_command_mode),
            _ => panic!("expected dial"),
        }
    }

    #[test]
    fn dial_modifiers_stripped_from_number() {
        let tokens = parse_line("ATDT555,1212").unwrap();
        match &tokens[0] {
            SubCommand::Dial(d) => assert_eq!(d.form, DialForm::PhonebookNumber("5551212".to_string())),
            _ => panic!("expected dial"),
        }
    }

    #[test]
    fn dial_ssh_requires_three_fields() {
        assert!(parse_line("ATDEhost|user|pass").is_ok());
        assert!(parse_line("ATDEhost|user").is_err());
    }

    #[test]
    fn amper_z_consumes_rest_of_line() {
        let tokens = parse_line("ATZ0&Z0=example.com,TELNET").unwrap();
        assert_eq!(tokens.len(), 2);
        match &tokens[1] {
            SubCommand::AmperZ { slot, spec } => {
                assert_eq!(*slot, 0);
                assert_eq!(spec, "example.com,TELNET");
            }
            _ => panic!("expected AmperZ"),
        }
    }

    #[test]
    fn faked_out_letters_parse_as_noop() {
        assert_eq!(parse_line("ATB0").unwrap(), vec![SubCommand::NoOp('B')]);
        assert_eq!(
            parse_line("AT&X1").unwrap(),
            vec![SubCommand::Amper(AmperSub::NoOp('X'))]
        );
    }
}
