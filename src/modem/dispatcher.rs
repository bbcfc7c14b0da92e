//! Executes parsed sub-commands against modem state; owns the dial/answer/
//! hangup flow and the handful of canned banners a real Hayes modem prints.

use std::time::Duration;

use tracing::{info, warn};

use super::parser::{AmperSub, DialCommand, DialForm, SubCommand, parse_line};
use super::phonebook::Protocol as PbProtocol;
use super::registers::REG_CARRIER_DETECT_RESPONSE_TIME;
use super::ringer;
use super::signals::Mode;
use super::{DteSink, Shared};
use crate::error::ResultCode;
use crate::transport::{self, Connection, Protocol as TxProtocol};

fn to_tx_protocol(p: PbProtocol) -> TxProtocol {
    match p {
        PbProtocol::Telnet => TxProtocol::Telnet,
        PbProtocol::Ssh => TxProtocol::Ssh,
    }
}

/// Print a result code per the active verbose/quiet rules.
pub async fn emit_code(dte: &DteSink, modem: &Shared, code: ResultCode) {
    let (verbose, quiet) = {
        let m = modem.lock().await;
        (m.settings.verbose, m.settings.quiet)
    };
    if quiet {
        return;
    }
    let mut w = dte.lock().await;
    let text = if verbose {
        code.verbose().to_string()
    } else {
        code.numeric().to_string()
    };
    let _ = w.println(&text).await;
}

/// Run one DTE line: lex it, execute the resulting sub-commands in order,
/// and emit the final result code. Remembers the line as "last command" on
/// successful acceptance, matching `A/`'s redial semantics.
pub async fn run_line(modem: &Shared, dte: &DteSink, line: &str) {
    let Ok(tokens) = parse_line(line) else {
        emit_code(dte, modem, ResultCode::Error).await;
        return;
    };
    let code = dispatch_tokens(modem, dte, &tokens).await;
    if code != ResultCode::Error {
        modem.lock().await.last_cmd = Some(line.to_string());
    }
    emit_code(dte, modem, code).await;
}

/// `A/` — re-run the last accepted line without re-emitting its own echo.
pub async fn rerun_last(modem: &Shared, dte: &DteSink) {
    let last = modem.lock().await.last_cmd.clone();
    match last {
        Some(line) => {
            let Ok(tokens) = parse_line(&line) else {
                emit_code(dte, modem, ResultCode::Error).await;
                return;
            };
            let code = dispatch_tokens(modem, dte, &tokens).await;
            emit_code(dte, modem, code).await;
        }
        None => emit_code(dte, modem, ResultCode::Error).await,
    }
}

async fn dispatch_tokens(modem: &Shared, dte: &DteSink, tokens: &[SubCommand]) -> ResultCode {
    for token in tokens {
        let code = if let SubCommand::Dial(dial) = token {
            do_dial(modem, dial).await
        } else {
            exec_one(modem, dte, token).await
        };
        if code != ResultCode::Ok {
            return code;
        }
    }
    ResultCode::Ok
}

async fn exec_one(modem: &Shared, dte: &DteSink, token: &SubCommand) -> ResultCode {
    match token {
        SubCommand::Attach => answer(modem).await,
        SubCommand::Hook(true) => {
            let mut m = modem.lock().await;
            m.signals.go_off_hook();
            ResultCode::Ok
        }
        SubCommand::Hook(false) => hangup(modem, dte).await,
        SubCommand::Echo(v) => {
            modem.lock().await.settings.echo_in_cmd_mode = *v;
            ResultCode::Ok
        }
        SubCommand::Quiet(v) => {
            modem.lock().await.settings.quiet = *v;
            ResultCode::Ok
        }
        SubCommand::Verbose(v) => {
            modem.lock().await.settings.verbose = *v;
            ResultCode::Ok
        }
        SubCommand::Reset(n) => soft_reset(modem, i32::from(*n)).await,
        SubCommand::SpeakerVolume(v) => {
            modem.lock().await.settings.speaker_volume = *v;
            ResultCode::Ok
        }
        SubCommand::SpeakerMode(v) => {
            modem.lock().await.settings.speaker_mode = *v;
            ResultCode::Ok
        }
        SubCommand::ConnectMsgSpeed(v) => {
            modem.lock().await.settings.connect_msg_speed = *v != 0;
            ResultCode::Ok
        }
        SubCommand::ExtendedResultStyle(v) => {
            let mut m = modem.lock().await;
            match v {
                0 => {
                    m.settings.extended_result_codes = false;
                    m.settings.busy_detect = false;
                }
                1 | 2 => {
                    m.settings.extended_result_codes = true;
                    m.settings.busy_detect = false;
                }
                3..=7 => {
                    m.settings.extended_result_codes = true;
                    m.settings.busy_detect = true;
                }
                _ => return ResultCode::Error,
            }
            ResultCode::Ok
        }
        SubCommand::Info(n) => {
            print_banner(modem, dte, *n).await;
            ResultCode::Ok
        }
        SubCommand::Online => online(modem).await,
        SubCommand::RegQuerySelected => {
            let v = modem.lock().await.registers.read_selected();
            let _ = dte.lock().await.println(&v.to_string()).await;
            ResultCode::Ok
        }
        SubCommand::RegWrite(n, v) => {
            let mut m = modem.lock().await;
            match m.registers.write(*n, *v) {
                Ok(effect) => {
                    use super::registers::WriteEffect;
                    match effect {
                        WriteEffect::AutoAnswerChanged => {
                            m.signals.set_auto_answer_led(*v > 0);
                        }
                        WriteEffect::EscCharChanged | WriteEffect::EscGuardTimeChanged | WriteEffect::None => {}
                    }
                    ResultCode::Ok
                }
                Err(()) => ResultCode::Error,
            }
        }
        SubCommand::RegQuery(n) => {
            let m = modem.lock().await;
            match m.registers.read(*n) {
                Some(v) => {
                    drop(m);
                    let _ = dte.lock().await.println(&v.to_string()).await;
                    ResultCode::Ok
                }
                None => ResultCode::Error,
            }
        }
        SubCommand::RegSelect(n) => match modem.lock().await.registers.set_selected(*n) {
            Ok(()) => ResultCode::Ok,
            Err(()) => ResultCode::Error,
        },
        SubCommand::AmperZ { slot, spec } => amper_z(modem, *slot, spec).await,
        SubCommand::Amper(sub) => amper(modem, dte, *sub).await,
        SubCommand::Debug(_) => ResultCode::Ok,
        SubCommand::NoOp(_) => ResultCode::Ok,
        SubCommand::Dial(_) => unreachable!("dial is handled by do_dial"),
    }
}

async fn answer(modem: &Shared) -> ResultCode {
    let delay = {
        let mut m = modem.lock().await;
        if m.signals.is_off_hook() {
            return ResultCode::Error;
        }
        m.signals.go_off_hook();
        m.registers.read(REG_CARRIER_DETECT_RESPONSE_TIME).unwrap_or(30)
    };
    tokio::time::sleep(Duration::from_millis(u64::from(delay) * 100)).await;
    let mut m = modem.lock().await;
    m.signals.set_dcd(true);
    m.signals.set_mode(Mode::Data);
    m.connect_speed = 38400;
    ResultCode::Connect
}

/// ATH0 / ATH1 hangup. Also reachable from the byte pump when the remote
/// end of an active call closes.
pub(crate) async fn hangup(modem: &Shared, dte: &DteSink) -> ResultCode {
    let mut m = modem.lock().await;
    let had_conn = m.conn.is_some();
    if let Some(mut conn) = m.conn.take() {
        let _ = conn.close().await;
    }
    m.signals.set_dcd(false);
    m.signals.set_dsr(false);
    m.signals.go_on_hook();
    m.signals.set_mode(Mode::Command);
    m.connect_speed = 0;
    m.signals.set_line_busy(false);
    drop(m);
    let _ = dte.lock().await.flush().await;
    if had_conn {
        ResultCode::NoCarrier
    } else {
        ResultCode::Ok
    }
}

async fn soft_reset(modem: &Shared, slot: i32) -> ResultCode {
    factory_reset(modem).await;
    let switched = modem.lock().await.profiles.switch(slot);
    let Ok((settings, registers)) = switched else {
        return ResultCode::Error;
    };
    tokio::time::sleep(Duration::from_millis(250)).await;
    let mut m = modem.lock().await;
    m.settings = settings;
    m.registers = registers;
    m.signals.set_dsr(true);
    m.signals.set_cts(true);
    ResultCode::Ok
}

async fn factory_reset(modem: &Shared) {
    let mut m = modem.lock().await;
    m.signals.go_on_hook();
    m.signals.set_line_busy(false);
    m.signals.set_dsr(false);
    m.signals.set_cts(false);
    m.signals.set_ri(false);
    m.signals.set_dcd(false);
    m.last_cmd = None;
    m.last_dialed = None;
    m.connect_speed = 0;
    m.registers.reset();
    m.settings.reset();
    m.phonebook.reload();
}

async fn amper_z(modem: &Shared, slot: u8, spec: &str) -> ResultCode {
    if spec.eq_ignore_ascii_case("d") {
        return match modem.lock().await.phonebook.delete(slot) {
            Ok(()) => ResultCode::Ok,
            Err(()) => ResultCode::Error,
        };
    }
    let fields: Vec<&str> = spec.split(',').collect();
    if fields.len() < 2 {
        return ResultCode::Error;
    }
    let Some(protocol) = (match fields[1].to_ascii_uppercase().as_str() {
        "TELNET" => Some(PbProtocol::Telnet),
        "SSH" => Some(PbProtocol::Ssh),
        _ => None,
    }) else {
        return ResultCode::Error;
    };
    // AT&Z stores by host; a placeholder digits-only phone is derived from
    // the slot itself so the entry is addressable via `ATDS<slot>` even
    // without a separately-dialed phone number.
    let mut m = modem.lock().await;
    match m.phonebook.add(slot, &format!("{slot:04}"), fields[0], protocol) {
        Ok(()) => ResultCode::Ok,
        Err(()) => ResultCode::Error,
    }
}

async fn amper(modem: &Shared, dte: &DteSink, sub: AmperSub) -> ResultCode {
    match sub {
        AmperSub::DcdControl(v) => {
            modem.lock().await.settings.dcd_pinned = v != 0;
            ResultCode::Ok
        }
        AmperSub::FactoryReset => {
            factory_reset(modem).await;
            ResultCode::Ok
        }
        AmperSub::DumpProfile => {
            print_amper_v(modem, dte).await;
            ResultCode::Ok
        }
        AmperSub::WriteActive(n) => {
            let mut m = modem.lock().await;
            let settings = m.settings.clone();
            let registers = m.registers.clone();
            match m.profiles.write_active(i32::from(n), &settings, &registers) {
                Ok(()) => ResultCode::Ok,
                Err(e) => {
                    warn!(error = %e, "failed to write profile");
                    ResultCode::Error
                }
            }
        }
        AmperSub::SetPowerUp(n) => match modem.lock().await.profiles.set_power_up_config(i32::from(n)) {
            Ok(()) => ResultCode::Ok,
            Err(_) => ResultCode::Error,
        },
        AmperSub::Dtr(v) => {
            modem.lock().await.settings.dtr = v;
            ResultCode::Ok
        }
        AmperSub::DsrPinned(v) => {
            modem.lock().await.settings.dsr_pinned = v != 0;
            ResultCode::Ok
        }
        AmperSub::NoOp(_) => ResultCode::Ok,
    }
}

async fn online(modem: &Shared) -> ResultCode {
    let mut m = modem.lock().await;
    if m.conn.is_some() {
        m.signals.set_mode(Mode::Data);
        ResultCode::Ok
    } else {
        ResultCode::Error
    }
}

async fn do_dial(modem: &Shared, dial: &DialCommand) -> ResultCode {
    modem.lock().await.signals.go_off_hook();

    let effective = if matches!(dial.form, DialForm::Last) {
        let last = modem.lock().await.last_dialed.clone();
        let Some(raw) = last else {
            modem.lock().await.signals.go_on_hook();
            return ResultCode::Error;
        };
        // Re-lex the remembered payload as if it had just been typed.
        match super::parser::parse_line(&format!("ATD{raw}")) {
            Ok(tokens) => match tokens.into_iter().next() {
                Some(SubCommand::Dial(d)) => d,
                _ => {
                    modem.lock().await.signals.go_on_hook();
                    return ResultCode::Error;
                }
            },
            Err(()) => {
                modem.lock().await.signals.go_on_hook();
                return ResultCode::Error;
            }
        }
    } else {
        modem.lock().await.last_dialed = Some(dial.raw.clone());
        dial.clone()
    };

    let resolved = resolve_target(modem, &effective.form).await;
    let (host, protocol, username, password) = match resolved {
        Ok(t) => t,
        Err(code) => {
            modem.lock().await.signals.go_on_hook();
            return code;
        }
    };

    match transport::dial(to_tx_protocol(protocol), &host, &username, &password, ringer::DIAL_TIMEOUT).await {
        Ok(conn) => {
            info!(%host, "dial succeeded");
            let mut m = modem.lock().await;
            m.conn = Some(conn);
            m.signals.set_dcd(true);
            m.connect_speed = 38400;
            if effective.stay_in_command_mode {
                m.signals.set_mode(Mode::Command);
                ResultCode::Ok
            } else {
                m.signals.set_mode(Mode::Data);
                ResultCode::Connect
            }
        }
        Err(e) => {
            modem.lock().await.signals.go_on_hook();
            if e.kind() == std::io::ErrorKind::TimedOut {
                ResultCode::NoAnswer
            } else {
                ResultCode::Busy
            }
        }
    }
}

async fn resolve_target(
    modem: &Shared,
    form: &DialForm,
) -> Result<(String, PbProtocol, String, String), ResultCode> {
    match form {
        DialForm::PhonebookNumber(number) => {
            let m = modem.lock().await;
            let entry = m.phonebook.lookup(number).map_err(|()| ResultCode::Error)?;
            Ok((entry.host.clone(), entry.protocol, entry.username.clone(), entry.password.clone()))
        }
        DialForm::Host(host) => Ok((host.clone(), PbProtocol::Telnet, String::new(), String::new())),
        DialForm::Ssh { host, user, pass } => Ok((host.clone(), PbProtocol::Ssh, user.clone(), pass.clone())),
        DialForm::Stored(n) => {
            let m = modem.lock().await;
            let phone = m.phonebook.lookup_stored_number(*n).map_err(|()| ResultCode::Error)?;
            let entry = m.phonebook.lookup(&phone).map_err(|()| ResultCode::Error)?;
            Ok((entry.host.clone(), entry.protocol, entry.username.clone(), entry.password.clone()))
        }
        DialForm::Last => unreachable!("DL resolved to a concrete form before reaching here"),
    }
}

async fn print_banner(modem: &Shared, dte: &DteSink, n: u8) {
    match n {
        0 => {
            let _ = dte.lock().await.println("14400").await;
        }
        1 => {
            let _ = dte.lock().await.println("058").await;
        }
        2 => {
            tokio::time::sleep(Duration::from_millis(500)).await;
            emit_code(dte, modem, ResultCode::Ok).await;
            let _ = dte.lock().await.println("").await;
        }
        3 => {
            for line in [
                "04-0045012 240 PASS",
                "04-00471-3143 080 PASS",
                "04-00472-3143 190 PASS",
            ] {
                let mut w = dte.lock().await;
                let _ = w.println(line).await;
                let _ = w.println("").await;
            }
        }
        4 => {
            for line in [
                "a097841F284C6403F00000090",
                "bF60437000",
                "r1031111111010000",
                "r3000111010000000",
            ] {
                let mut w = dte.lock().await;
                let _ = w.println(line).await;
                let _ = w.println("").await;
            }
        }
        5 => {
            let mut w = dte.lock().await;
            let _ = w.println("004").await;
            let _ = w.println("a 001 001 003 PASS").await;
        }
        _ => {}
    }
}

async fn print_amper_v(modem: &Shared, dte: &DteSink) {
    let (settings_summary, registers_summary, profiles_dump, phonebook_dump) = {
        let m = modem.lock().await;
        (
            m.settings.summary(),
            m.registers.summary(),
            m.profiles.dump(),
            m.phonebook.dump(),
        )
    };
    let mut w = dte.lock().await;
    let _ = w.println("ACTIVE PROFILE:").await;
    let _ = w.println(&settings_summary).await;
    let _ = w.write_bytes(registers_summary.as_bytes()).await;
    let _ = w.println("").await;
    let _ = w.write_bytes(profiles_dump.as_bytes()).await;
    let _ = w.println("TELEPHONE NUMBERS:").await;
    let _ = w.write_bytes(phonebook_dump.as_bytes()).await;
}
