//! Serve an already built site.
//!
//! No bundler run and no watching: the output directory is served as is,
//! under the base path, until Ctrl+C.

use anyhow::{Result, bail};

use crate::{config::SiteConfig, core::shutdown_signal, log, serve::DevServer};

pub fn serve_site(config: &SiteConfig) -> Result<()> {
    let server = bind_output(config)?;
    server.log_ready(config.get_root());

    // Ctrl+C unblocks the request loop instead of exiting
    let _signal = shutdown_signal();
    if server.spawn().join().is_err() {
        bail!("request loop panicked");
    }
    log!("serve"; "stopped");
    Ok(())
}

/// Bind the dev server over a built output directory.
fn bind_output(config: &SiteConfig) -> Result<DevServer> {
    let output = config.output_dir();
    if !output.join("index.html").is_file() {
        bail!(
            "no built site in {}, run `brisk build` first",
            output.display()
        );
    }
    DevServer::bind(config)
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};
    use std::net::{SocketAddr, TcpStream};

    use tempfile::TempDir;

    use super::*;
    use crate::config::{Mode, test_site_config};

    #[test]
    fn test_requires_built_output() {
        let dir = TempDir::new().unwrap();
        let mut config = test_site_config(dir.path(), Mode::Production);
        config.serve.port = 0;
        let err = bind_output(&config).err().unwrap();
        assert!(err.to_string().contains("brisk build"), "{err}");
    }

    #[test]
    fn test_serves_built_output() {
        let dir = TempDir::new().unwrap();
        let mut config = test_site_config(dir.path(), Mode::Production);
        config.serve.port = 0;
        std::fs::create_dir_all(config.output_dir()).unwrap();
        std::fs::write(config.output_dir().join("index.html"), "<html>built</html>").unwrap();

        let server = bind_output(&config).unwrap();
        let addr = SocketAddr::new("127.0.0.1".parse().unwrap(), server.addr().port());
        let _handle = server.spawn();

        let mut stream = TcpStream::connect(addr).unwrap();
        write!(stream, "GET / HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n").unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).unwrap();
        assert!(response.contains("built"), "{response}");
    }
}
