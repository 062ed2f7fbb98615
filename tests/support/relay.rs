//! Scripted relay for exercising the client over real sockets

use std::collections::VecDeque;
use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::mpsc;
use std::thread;

/// Everything a relay saw during one connection
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    /// Command lines, in order
    pub commands: Vec<String>,
    /// Lines received between DATA and the terminator, one entry per DATA cycle
    pub data: Vec<Vec<String>>,
    /// Whether the client closed the connection itself
    pub closed_by_client: bool,
}

impl Transcript {
    /// Value of a header in the first DATA block
    pub fn header(&self, name: &str) -> Option<&str> {
        let prefix = format!("{name}:");
        self.data
            .first()?
            .iter()
            .take_while(|line| !line.is_empty())
            .find_map(|line| line.strip_prefix(&prefix))
            .map(str::trim)
    }

    /// Lines after the blank line in the first DATA block
    pub fn body(&self) -> Vec<&str> {
        self.data
            .first()
            .map(|block| {
                block
                    .iter()
                    .skip_while(|line| !line.is_empty())
                    .skip(1)
                    .map(String::as_str)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn rcpt_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| c.starts_with("RCPT TO:"))
            .count()
    }
}

/// A relay that answers from a fixed list of replies.
///
/// The first reply is the greeting. Each command line consumes the next
/// reply, except `DATA`, which only consumes one if it is a 3xx. The line
/// ending a DATA block consumes the next reply.
pub struct ScriptedRelay {
    replies: VecDeque<String>,
}

impl ScriptedRelay {
    pub fn new(replies: &[&str]) -> Self {
        Self {
            replies: replies.iter().map(|r| (*r).to_owned()).collect(),
        }
    }

    /// Serve one connection in a background thread
    pub fn start(self) -> (u16, mpsc::Receiver<Transcript>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            if let Ok((stream, _)) = listener.accept() {
                let transcript = self.handle_client(stream);
                // Errors when there are no listeners
                let _ = tx.send(transcript);
            }
        });

        (port, rx)
    }

    fn handle_client(mut self, mut stream: TcpStream) -> Transcript {
        let mut transcript = Transcript::default();
        let mut reader = BufReader::new(stream.try_clone().unwrap());

        if !self.reply(&mut stream) {
            return transcript;
        }

        let mut in_data_mode = false;
        let mut line_buffer = Vec::new();
        loop {
            line_buffer.clear();
            match reader.read_until(b'\n', &mut line_buffer) {
                Ok(0) => {
                    transcript.closed_by_client = true;
                    break;
                }
                Ok(_) => {
                    let line = String::from_utf8_lossy(&line_buffer)
                        .trim_end_matches(['\r', '\n'])
                        .to_owned();

                    if in_data_mode {
                        if line == "." {
                            in_data_mode = false;
                            if !self.reply(&mut stream) {
                                break;
                            }
                        } else if let Some(block) = transcript.data.last_mut() {
                            block.push(line);
                        }
                        continue;
                    }

                    let command = line.trim().to_owned();
                    transcript.commands.push(command.clone());

                    if command.eq_ignore_ascii_case("DATA") {
                        in_data_mode = true;
                        transcript.data.push(Vec::new());
                        if self.next_is_intermediate() && !self.reply(&mut stream) {
                            break;
                        }
                        continue;
                    }

                    if !self.reply(&mut stream) {
                        break;
                    }
                }
                Err(_) => break,
            }
        }

        transcript
    }

    fn next_is_intermediate(&self) -> bool {
        self.replies
            .front()
            .is_some_and(|reply| reply.starts_with('3'))
    }

    /// Send the next scripted reply. Returns false when the script is exhausted.
    fn reply(&mut self, stream: &mut TcpStream) -> bool {
        match self.replies.pop_front() {
            Some(reply) => {
                stream.write_all(format!("{reply}\r\n").as_bytes()).is_ok() && stream.flush().is_ok()
            }
            None => false,
        }
    }
}
