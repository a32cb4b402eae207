use crate::error::TransferError;
use std::fmt;
use std::net::{Ipv4Addr, SocketAddrV4};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

/// FTP reply codes this client cares about.
pub mod code {
    pub const COMMAND_OK: u16 = 200;
    pub const SERVICE_READY: u16 = 220;
    pub const CLOSING_DATA: u16 = 226;
    pub const ENTERING_PASSIVE: u16 = 227;
    pub const LOGGED_IN: u16 = 230;
    pub const FILE_ACTION_OK: u16 = 250;
    pub const FILE_UNAVAILABLE: u16 = 550;
}

/// Final status of one FTP command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub code: u16,
    pub text: String,
}

impl Reply {
    pub fn new(code: u16, text: impl Into<String>) -> Self {
        Self {
            code,
            text: text.into(),
        }
    }

    pub fn is_preliminary(&self) -> bool {
        (100..200).contains(&self.code)
    }

    pub fn is_completion(&self) -> bool {
        (200..300).contains(&self.code)
    }

    pub fn is_intermediate(&self) -> bool {
        (300..400).contains(&self.code)
    }

    /// Data connection closed after a successful transfer.
    pub fn is_transfer_complete(&self) -> bool {
        self.code == code::CLOSING_DATA
    }

    pub fn is_file_action_ok(&self) -> bool {
        self.code == code::FILE_ACTION_OK
    }

    /// Target missing or inaccessible.
    pub fn is_file_unavailable(&self) -> bool {
        self.code == code::FILE_UNAVAILABLE
    }

    pub fn into_unexpected(self) -> TransferError {
        TransferError::UnexpectedReply {
            code: self.code,
            text: self.text,
        }
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {}", self.code, self.text)
    }
}

/// True if `s` would end a control-channel line early.
pub fn has_line_break(s: &str) -> bool {
    s.contains(['\r', '\n'])
}

/// Formats one control-channel command line.
///
/// Arguments containing CR or LF are refused; they would smuggle extra
/// commands onto the connection.
pub fn command(verb: &str, arg: Option<&str>) -> Result<String, TransferError> {
    match arg {
        Some(arg) if has_line_break(arg) => Err(TransferError::LineBreakInArgument {
            verb: verb.to_string(),
            arg: arg.to_string(),
        }),
        Some(arg) => Ok(format!("{} {}\r\n", verb, arg)),
        None => Ok(format!("{}\r\n", verb)),
    }
}

/// Reads one (possibly multi-line) reply from the control channel.
pub async fn read_reply<R: AsyncBufRead + Unpin>(reader: &mut R) -> Result<Reply, TransferError> {
    let first = read_line(reader).await?;
    let (code, multiline, text) = split_reply_line(&first)?;
    if !multiline {
        return Ok(Reply::new(code, text));
    }

    // Continuation lines run until "<code> " repeats at the start of a line
    let terminator = format!("{} ", code);
    let mut lines = vec![text.to_string()];
    loop {
        let line = read_line(reader).await?;
        if let Some(rest) = line.strip_prefix(&terminator) {
            lines.push(rest.to_string());
            break;
        }
        if line == code.to_string() {
            break;
        }
        lines.push(line);
    }
    Ok(Reply::new(code, lines.join("\n")))
}

async fn read_line<R: AsyncBufRead + Unpin>(reader: &mut R) -> Result<String, TransferError> {
    let mut buf = String::new();
    let n = reader.read_line(&mut buf).await?;
    if n == 0 {
        return Err(TransferError::ConnectionClosed);
    }
    Ok(buf.trim_end_matches(['\r', '\n']).to_string())
}

fn split_reply_line(line: &str) -> Result<(u16, bool, &str), TransferError> {
    let code = line
        .get(..3)
        .filter(|digits| digits.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|digits| digits.parse::<u16>().ok())
        .ok_or_else(|| TransferError::MalformedReply(line.to_string()))?;

    match line.as_bytes().get(3) {
        None => Ok((code, false, "")),
        Some(b' ') => Ok((code, false, &line[4..])),
        Some(b'-') => Ok((code, true, &line[4..])),
        Some(_) => Err(TransferError::MalformedReply(line.to_string())),
    }
}

/// Extracts the data-channel address from a 227 reply text,
/// e.g. `Entering Passive Mode (127,0,0,1,195,80).`
pub fn parse_pasv(text: &str) -> Result<SocketAddrV4, TransferError> {
    let start = match text.find('(') {
        Some(idx) => idx + 1,
        None => text
            .find(|c: char| c.is_ascii_digit())
            .ok_or_else(|| TransferError::MalformedReply(text.to_string()))?,
    };
    let numbers: Vec<u8> = text[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == ',')
        .collect::<String>()
        .split(',')
        .map(|n| n.parse::<u8>())
        .collect::<Result<_, _>>()
        .map_err(|_| TransferError::MalformedReply(text.to_string()))?;

    let &[a, b, c, d, hi, lo] = numbers.as_slice() else {
        return Err(TransferError::MalformedReply(text.to_string()));
    };
    let port = (u16::from(hi) << 8) | u16::from(lo);
    Ok(SocketAddrV4::new(Ipv4Addr::new(a, b, c, d), port))
}

/// Splits an NLST payload into entry names, dropping blank lines.
pub fn parse_name_list(data: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(data)
        .lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.trim().is_empty())
        .map(str::to_string)
        .collect()
}
