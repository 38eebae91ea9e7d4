// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Local HTTP responder used by client tests.
//!
//! Every connection is answered with one canned reply chosen from the request
//! line, then closed. Request heads are recorded so tests can count requests
//! and inspect headers.

use std::{
    io::{Read, Write},
    net::{TcpListener, TcpStream},
    sync::{Arc, Mutex},
    thread,
};

/// Canned HTTP response.
#[derive(Debug, Clone,)]
pub(crate) struct Reply
{
    status:  u16,
    headers: Vec<(&'static str, String,),>,
    body:    String,
}

impl Reply
{
    pub(crate) fn new(status: u16, body: &str,) -> Self
    {
        Self {
            status,
            headers: Vec::new(),
            body: body.to_owned(),
        }
    }

    pub(crate) fn header(mut self, name: &'static str, value: &str,) -> Self
    {
        self.headers.push((name, value.to_owned(),),);
        self
    }

    fn write_to(&self, stream: &mut TcpStream,) -> std::io::Result<(),>
    {
        let mut head = format!("HTTP/1.1 {} Canned\r\nConnection: close\r\n", self.status);
        if self.status != 204 {
            head.push_str(&format!("Content-Length: {}\r\n", self.body.len()),);
        }
        for (name, value,) in &self.headers {
            head.push_str(&format!("{name}: {value}\r\n"),);
        }
        head.push_str("\r\n",);

        stream.write_all(head.as_bytes(),)?;
        stream.write_all(self.body.as_bytes(),)?;
        stream.flush()
    }
}

/// Server bound to an ephemeral loopback port.
pub(crate) struct TestServer
{
    address:  String,
    requests: Arc<Mutex<Vec<String,>,>,>,
}

impl TestServer
{
    /// Starts serving `respond(request_line)` on a background thread.
    pub(crate) fn start<F,>(respond: F,) -> Self
    where
        F: Fn(&str,) -> Reply + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0",).expect("failed to bind test listener",);
        let address = format!(
            "http://{}",
            listener.local_addr().expect("listener has an address",)
        );
        let requests = Arc::new(Mutex::new(Vec::new(),),);
        let recorded = Arc::clone(&requests,);

        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(mut stream,) = stream else {
                    break;
                };
                let head = read_head(&mut stream,);
                let request_line = head.lines().next().unwrap_or_default().to_owned();
                recorded.lock().expect("request log poisoned",).push(head,);

                let _ = respond(&request_line,).write_to(&mut stream,);
            }
        },);

        Self {
            address,
            requests,
        }
    }

    /// Base URL, without a trailing slash.
    pub(crate) fn url(&self,) -> &str
    {
        &self.address
    }

    /// Heads of all requests received so far.
    pub(crate) fn requests(&self,) -> Vec<String,>
    {
        self.requests.lock().expect("request log poisoned",).clone()
    }
}

fn read_head(stream: &mut TcpStream,) -> String
{
    let mut head = Vec::new();
    let mut buffer = [0_u8; 1024];

    while !head.windows(4,).any(|window| window == b"\r\n\r\n",) {
        match stream.read(&mut buffer,) {
            Ok(0,) | Err(_,) => break,
            Ok(read,) => head.extend_from_slice(&buffer[..read],),
        }
    }

    String::from_utf8_lossy(&head,).into_owned()
}
