//! Example mTLS client
mod args;

use mtls_files::{Role, X509Files};
use structopt::StructOpt;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let opt = args::Args::from_args();

    let mut credentials =
        X509Files::new(opt.cert, opt.key, opt.ca).transport_credentials(Role::Client)?;
    if let Some(name) = opt.server_name {
        credentials.override_server_name(name)?;
    }

    let socket = TcpStream::connect(&opt.address).await?;
    let (mut stream, info) = credentials.client_handshake(&opt.address, socket).await?;
    log::info!(
        "Connected to {} over TLS {}",
        opt.address,
        info.security_version().unwrap_or("?")
    );

    stream.write_all(opt.message.as_bytes()).await?;
    let mut buf = vec![0u8; opt.message.len()];
    stream.read_exact(&mut buf).await?;
    println!("{}", String::from_utf8_lossy(&buf));

    stream.shutdown().await?;
    Ok(())
}
