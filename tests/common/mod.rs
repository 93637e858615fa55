#![allow(dead_code)]

pub mod temp_files {
    use std::io::Write;
    use tempfile::NamedTempFile;

    /// Write `content` to a temporary `.yaml` file; the file lives as long as the handle.
    pub fn create_temp_yaml(content: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new()
            .prefix("rsrv_test_")
            .suffix(".yaml")
            .tempfile()
            .unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }
}

pub mod test_server {
    use resource_server::app::{build_service, build_service_with};
    use resource_server::dispatcher::Dispatcher;
    use resource_server::resources::AppState;
    use resource_server::runtime_config::RuntimeConfig;
    use resource_server::server::{HttpServer, ServerHandle};
    use resource_server::spec::{load_spec, LoadedSpec};
    use std::sync::Once;

    pub const SPEC_PATH: &str = "doc/openapi.yaml";

    /// Ensures May coroutines are configured only once
    static MAY_INIT: Once = Once::new();

    pub fn setup_may_runtime() {
        MAY_INIT.call_once(|| {
            may::config().set_stack_size(0x8000);
        });
    }

    fn test_config() -> RuntimeConfig {
        RuntimeConfig {
            addr: "127.0.0.1:0".to_string(),
            ..RuntimeConfig::default()
        }
    }

    /// A running server that stops when dropped.
    pub struct TestServer {
        handle: Option<ServerHandle>,
        pub state: AppState,
    }

    impl TestServer {
        pub fn addr(&self) -> std::net::SocketAddr {
            self.handle.as_ref().unwrap().addr()
        }
    }

    impl Drop for TestServer {
        fn drop(&mut self) {
            if let Some(handle) = self.handle.take() {
                handle.stop();
            }
        }
    }

    fn start(service: resource_server::server::AppService, state: AppState) -> TestServer {
        let handle = HttpServer(service).start("127.0.0.1:0").unwrap();
        handle.wait_ready().unwrap();
        TestServer {
            handle: Some(handle),
            state,
        }
    }

    /// Serve `doc/openapi.yaml` with the standard handlers and fresh stores.
    pub fn start_default() -> TestServer {
        setup_may_runtime();
        let spec = load_spec(SPEC_PATH).unwrap();
        let state = AppState::new();
        let service = build_service(&spec, &state, &test_config()).unwrap();
        start(service, state)
    }

    /// Serve `spec` with the standard handlers, then let `customize` add or replace some.
    pub fn start_with(spec: &LoadedSpec, customize: impl FnOnce(&mut Dispatcher)) -> TestServer {
        setup_may_runtime();
        let state = AppState::new();
        let service = build_service_with(spec, &state, &test_config(), customize).unwrap();
        start(service, state)
    }
}

pub mod http {
    use std::io::{Read, Write};
    use std::net::{SocketAddr, TcpStream};
    use std::time::Duration;

    /// A parsed HTTP/1.1 response.
    #[derive(Debug)]
    pub struct TestResponse {
        pub status: u16,
        /// Header names lowercased
        pub headers: Vec<(String, String)>,
        pub body: String,
    }

    impl TestResponse {
        pub fn header(&self, name: &str) -> Option<&str> {
            self.headers
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.as_str())
        }

        pub fn json(&self) -> serde_json::Value {
            serde_json::from_str(&self.body)
                .unwrap_or_else(|e| panic!("body is not JSON ({e}): {}", self.body))
        }
    }

    fn content_length(head: &str) -> Option<usize> {
        head.lines().find_map(|line| {
            let (k, v) = line.split_once(':')?;
            k.trim()
                .eq_ignore_ascii_case("content-length")
                .then(|| v.trim().parse().ok())
                .flatten()
        })
    }

    /// Send a raw request and read one response (until Content-Length is satisfied or timeout).
    pub fn send_request(addr: &SocketAddr, req: &str) -> String {
        let mut stream = TcpStream::connect(addr).unwrap();
        stream.write_all(req.as_bytes()).unwrap();
        stream
            .set_read_timeout(Some(Duration::from_millis(2000)))
            .unwrap();
        let mut buf = Vec::new();
        loop {
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                let head = String::from_utf8_lossy(&buf[..pos]).to_string();
                let expected = content_length(&head).unwrap_or(0);
                if buf.len() >= pos + 4 + expected {
                    break;
                }
            }
            let mut tmp = [0u8; 4096];
            match stream.read(&mut tmp) {
                Ok(0) => break,
                Ok(n) => buf.extend_from_slice(&tmp[..n]),
                Err(ref e)
                    if e.kind() == std::io::ErrorKind::WouldBlock
                        || e.kind() == std::io::ErrorKind::TimedOut =>
                {
                    break
                }
                Err(e) => panic!("read error: {:?}", e),
            }
        }
        String::from_utf8_lossy(&buf).to_string()
    }

    pub fn parse_response(resp: &str) -> TestResponse {
        let (head, body) = resp.split_once("\r\n\r\n").unwrap_or((resp, ""));
        let mut lines = head.lines();
        let status = lines
            .next()
            .and_then(|l| l.split_whitespace().nth(1))
            .and_then(|s| s.parse().ok())
            .unwrap_or(0);
        let headers = lines
            .filter_map(|l| l.split_once(':'))
            .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
            .collect();
        TestResponse {
            status,
            headers,
            body: body.to_string(),
        }
    }

    /// Issue `method path` with an optional JSON body and parse the reply.
    pub fn call(addr: &SocketAddr, method: &str, path: &str, body: Option<&str>) -> TestResponse {
        let req = match body {
            Some(b) => format!(
                "{method} {path} HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{b}",
                b.len()
            ),
            None => format!("{method} {path} HTTP/1.1\r\nHost: localhost\r\n\r\n"),
        };
        parse_response(&send_request(addr, &req))
    }

    pub fn get(addr: &SocketAddr, path: &str) -> TestResponse {
        call(addr, "GET", path, None)
    }

    pub fn post(addr: &SocketAddr, path: &str, body: &str) -> TestResponse {
        call(addr, "POST", path, Some(body))
    }

    pub fn put(addr: &SocketAddr, path: &str, body: &str) -> TestResponse {
        call(addr, "PUT", path, Some(body))
    }

    pub fn delete(addr: &SocketAddr, path: &str) -> TestResponse {
        call(addr, "DELETE", path, None)
    }
}
