//! 集成测试共用的本地 HTTP 替身服务。
//!
//! 每个连接只处理一个请求，按顺序消费预设的应答；应答后关闭连接。

#![allow(dead_code)]

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// 预设应答
pub enum Reply {
    Json { status: u16, body: String },
    /// 读完请求后等待一段时间再应答（用于触发客户端超时）
    Delayed { delay: Duration, status: u16, body: String },
    /// 读完请求后直接断开连接，不返回任何字节
    Hangup,
    /// 声明的 Content-Length 大于实际发送的响应体，发送后断开
    Truncated { status: u16, body: String, declared_len: usize },
}

impl Reply {
    pub fn ok(body: impl Into<String>) -> Self {
        Self::Json {
            status: 200,
            body: body.into(),
        }
    }

    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self::Json {
            status,
            body: body.into(),
        }
    }
}

/// 一次被捕获的请求
pub struct CapturedRequest {
    pub head: String,
    pub body: Vec<u8>,
}

impl CapturedRequest {
    pub fn request_line(&self) -> &str {
        self.head.lines().next().unwrap_or_default()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.head.lines().skip(1).find_map(|line| {
            let (key, value) = line.split_once(':')?;
            key.trim()
                .eq_ignore_ascii_case(name)
                .then(|| value.trim())
        })
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).expect("request body is not JSON")
    }
}

pub struct MockServer {
    pub base_url: String,
    handle: JoinHandle<Vec<CapturedRequest>>,
}

impl MockServer {
    pub fn start(replies: Vec<Reply>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind test server failed");
        let addr = listener.local_addr().expect("read local addr failed");

        let handle = thread::spawn(move || {
            let mut captured = Vec::new();
            for reply in replies {
                let (mut stream, _) = listener.accept().expect("accept failed");
                captured.push(read_request(&mut stream));
                respond(stream, reply);
            }
            captured
        });

        Self {
            base_url: format!("http://127.0.0.1:{}/api/v1", addr.port()),
            handle,
        }
    }

    /// 等待所有预设应答发送完毕，返回捕获的请求。
    pub fn finish(self) -> Vec<CapturedRequest> {
        self.handle.join().expect("server thread failed")
    }
}

/// 返回一个当前没有监听者的本地地址。
pub fn refused_base_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind test server failed");
    let port = listener.local_addr().expect("read local addr failed").port();
    drop(listener);
    format!("http://127.0.0.1:{}/api/v1", port)
}

fn respond(mut stream: TcpStream, reply: Reply) {
    let (status, body) = match reply {
        Reply::Hangup => return,
        Reply::Truncated {
            status,
            body,
            declared_len,
        } => {
            let head = format!(
                "HTTP/1.1 {} Mock\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                status, declared_len
            );
            let _ = stream.write_all(head.as_bytes());
            let _ = stream.write_all(body.as_bytes());
            let _ = stream.flush();
            return;
        }
        Reply::Json { status, body } => (status, body),
        Reply::Delayed {
            delay,
            status,
            body,
        } => {
            thread::sleep(delay);
            (status, body)
        }
    };

    let response = format!(
        "HTTP/1.1 {} Mock\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    );
    // 超时场景下客户端可能已经断开
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.flush();
}

fn read_request(stream: &mut TcpStream) -> CapturedRequest {
    stream
        .set_read_timeout(Some(Duration::from_secs(5)))
        .expect("set read timeout failed");

    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let header_end = loop {
        if let Some(pos) = find(&buf, b"\r\n\r\n") {
            break pos + 4;
        }
        let n = stream.read(&mut chunk).expect("read request failed");
        assert!(n > 0, "connection closed before headers were complete");
        buf.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).into_owned();
    let mut request = CapturedRequest {
        head,
        body: buf[header_end..].to_vec(),
    };

    if let Some(length) = request.header("content-length").and_then(|v| v.parse::<usize>().ok()) {
        while request.body.len() < length {
            let n = stream.read(&mut chunk).expect("read body failed");
            if n == 0 {
                break;
            }
            request.body.extend_from_slice(&chunk[..n]);
        }
    } else if request
        .header("transfer-encoding")
        .is_some_and(|v| v.eq_ignore_ascii_case("chunked"))
    {
        while find(&request.body, b"0\r\n\r\n").is_none() {
            let n = stream.read(&mut chunk).expect("read body failed");
            if n == 0 {
                break;
            }
            request.body.extend_from_slice(&chunk[..n]);
        }
    }

    request
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|window| window == needle)
}
