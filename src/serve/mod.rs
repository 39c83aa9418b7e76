//! Development server.
//!
//! Serves the output directory under the site base path, the way the site
//! is deployed. Started by `brisk start` after the first successful bundle.

mod path;
mod response;

use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use anyhow::Result;
use owo_colors::OwoColorize;
use tiny_http::{Request, Server};

use crate::config::SiteConfig;
use crate::utils::path::route;
use crate::{debug, log};

/// Maximum number of port binding attempts.
const MAX_PORT_RETRIES: u16 = 10;

/// What the request loop needs to know about the site.
#[derive(Debug, Clone)]
struct Site {
    output_dir: PathBuf,
    base_path: String,
    history_fallback: bool,
}

/// Bound server, request loop not yet running.
pub struct DevServer {
    server: Arc<Server>,
    addr: SocketAddr,
    site: Site,
}

impl DevServer {
    /// Bind the configured interface, trying the following ports if taken.
    pub fn bind(config: &SiteConfig) -> Result<Self> {
        let (server, addr) = bind_with_retry(config.serve.interface, config.serve.port)?;
        let server = Arc::new(server);
        crate::core::register_server(Arc::clone(&server));

        Ok(Self {
            server,
            addr,
            site: Site {
                output_dir: config.output_dir().to_path_buf(),
                base_path: config.build.base_path.clone(),
                history_fallback: config.serve.history_fallback,
            },
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// `http://localhost:8080/base/`
    pub fn local_url(&self) -> String {
        let host = if self.addr.ip().is_loopback() || self.addr.ip().is_unspecified() {
            "localhost".to_string()
        } else {
            self.addr.ip().to_string()
        };
        let origin = format!("http://{host}:{}", self.addr.port());
        match self.site.base_path.trim_matches('/') {
            "" => format!("{origin}/"),
            base => format!("{}/", route::join_url(&origin, base)),
        }
    }

    /// Log the ready message naming where to open the browser.
    pub fn log_ready(&self, root: &Path) {
        let chevron = ">".green().bold().to_string();
        let files = self
            .site
            .output_dir
            .strip_prefix(root)
            .unwrap_or(&self.site.output_dir)
            .display()
            .to_string();
        log!(
            "serve";
            "{}\n  {chevron} Access your site at {}\n  {chevron} Files are in {}",
            "Ready!".green().bold(),
            self.local_url().magenta().underline(),
            files.cyan()
        );
    }

    /// Run the request loop on a background thread.
    pub fn spawn(self) -> JoinHandle<()> {
        thread::spawn(move || run_request_loop(&self.server, &self.site))
    }
}

/// Bind to the specified interface and port, with automatic port retry.
fn bind_with_retry(interface: IpAddr, base_port: u16) -> Result<(Server, SocketAddr)> {
    let mut last_error = None;
    for offset in 0..MAX_PORT_RETRIES {
        let port = base_port.saturating_add(offset);
        let addr = SocketAddr::new(interface, port);

        match Server::http(addr) {
            Ok(server) => {
                if offset > 0 {
                    log!("serve"; "port {} in use, using {} instead", base_port, port);
                }
                // Port 0 binds an ephemeral port
                let addr = server.server_addr().to_ip().unwrap_or(addr);
                return Ok((server, addr));
            }
            Err(e) => last_error = Some(e),
        }
    }
    Err(anyhow::anyhow!(
        "Failed to bind after {} attempts (ports {}-{}): {}",
        MAX_PORT_RETRIES,
        base_port,
        base_port.saturating_add(MAX_PORT_RETRIES - 1),
        last_error.map(|e| e.to_string()).unwrap_or_default()
    ))
}

fn run_request_loop(server: &Server, site: &Site) {
    let pool = match rayon::ThreadPoolBuilder::new().num_threads(4).build() {
        Ok(pool) => pool,
        Err(e) => {
            log!("serve"; "failed to create thread pool: {e}");
            return;
        }
    };

    for request in server.incoming_requests() {
        let site = site.clone();
        pool.spawn(move || {
            if let Err(e) = handle_request(request, &site) {
                log!("serve"; "request error: {e}");
            }
        });
    }
    debug!("serve"; "request loop stopped");
}

/// Handle a single HTTP request
fn handle_request(request: Request, site: &Site) -> Result<()> {
    if crate::core::is_shutdown() {
        return response::respond_unavailable(request);
    }

    let url = request.url().to_string();
    if site.base_path != "/" && path::is_site_root(&url) {
        return response::respond_redirect(request, &format!("{}/", site.base_path));
    }
    let Some(local) = path::strip_base_path(&url, &site.base_path) else {
        return response::respond_not_found(request, &site.output_dir);
    };

    if let Some(file) = path::resolve_path(local, &site.output_dir) {
        return response::respond_file(request, &file);
    }

    if site.history_fallback && path::is_history_route(local) {
        let index = site.output_dir.join("index.html");
        if index.is_file() {
            return response::respond_file(request, &index);
        }
    }

    response::respond_not_found(request, &site.output_dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Mode, test_site_config};
    use std::io::{Read, Write};
    use std::net::TcpStream;
    use tempfile::TempDir;

    fn get(addr: SocketAddr, path: &str) -> String {
        let mut stream = TcpStream::connect(addr).unwrap();
        write!(stream, "GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n").unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).unwrap();
        response
    }

    #[test]
    fn test_serves_output_under_base_path() {
        let dir = TempDir::new().unwrap();
        let mut config = test_site_config(dir.path(), Mode::Development);
        config.build.base_path = "/app".into();
        config.serve.port = 0;
        config.serve.history_fallback = true;
        fs_write(config.output_dir(), "index.html", "<html>home</html>");
        fs_write(config.output_dir(), "assets/main.js", "main()");

        let server = DevServer::bind(&config).unwrap();
        let addr = server.addr();
        assert!(server.local_url().ends_with("/app/"));
        let _handle = server.spawn();

        let addr = SocketAddr::new("127.0.0.1".parse().unwrap(), addr.port());
        assert!(get(addr, "/app/assets/main.js").contains("main()"));
        assert!(get(addr, "/app/").contains("home"));
        assert!(get(addr, "/app/users/42").contains("home"));
        assert!(get(addr, "/assets/main.js").starts_with("HTTP/1.1 404"));
        assert!(get(addr, "/app/missing.js").starts_with("HTTP/1.1 404"));
    }

    #[test]
    fn test_root_redirects_to_base_path() {
        let dir = TempDir::new().unwrap();
        let mut config = test_site_config(dir.path(), Mode::Development);
        config.build.base_path = "/app".into();
        config.serve.port = 0;
        fs_write(config.output_dir(), "index.html", "<html>home</html>");

        let server = DevServer::bind(&config).unwrap();
        let addr = SocketAddr::new("127.0.0.1".parse().unwrap(), server.addr().port());
        let _handle = server.spawn();

        let response = get(addr, "/");
        assert!(response.starts_with("HTTP/1.1 302"), "{response}");
        assert!(header(&response, "location").as_deref() == Some("/app/"), "{response}");

        let response = get(addr, "/?utm=1");
        assert!(response.starts_with("HTTP/1.1 302"), "{response}");

        let response = get(addr, "/app/");
        assert_eq!(header(&response, "cache-control").as_deref(), Some("no-cache"));
    }

    #[test]
    fn test_root_is_served_without_base_path() {
        let dir = TempDir::new().unwrap();
        let mut config = test_site_config(dir.path(), Mode::Development);
        config.serve.port = 0;
        fs_write(config.output_dir(), "index.html", "<html>home</html>");

        let server = DevServer::bind(&config).unwrap();
        let addr = SocketAddr::new("127.0.0.1".parse().unwrap(), server.addr().port());
        let _handle = server.spawn();
        assert!(get(addr, "/").contains("home"));
    }

    /// Value of the first header named `name` (case-insensitive).
    fn header(response: &str, name: &str) -> Option<String> {
        response
            .lines()
            .take_while(|line| !line.is_empty())
            .filter_map(|line| line.split_once(':'))
            .find(|(key, _)| key.trim().eq_ignore_ascii_case(name))
            .map(|(_, value)| value.trim().to_string())
    }

    fn fs_write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }
}
