//! Example mTLS echo server
use mtls_files::{Role, TlsCredentials, X509Files};
use structopt::StructOpt;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

#[derive(StructOpt, Debug)]
struct Args {
    /// Address + port to listen on
    #[structopt(short = "a", long, default_value = "[::1]:50051")]
    address: String,

    /// Server certificate
    #[structopt(long, default_value = "tls/server.pem")]
    cert: String,

    /// Server private key
    #[structopt(long, default_value = "tls/server.key")]
    key: String,

    /// CA bundle client certificates are verified against
    #[structopt(long, default_value = "tls/ca.pem")]
    ca: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let opt = Args::from_args();

    // Refuse to start without valid credentials
    let credentials =
        X509Files::new(opt.cert, opt.key, opt.ca).transport_credentials(Role::Server)?;

    let listener = TcpListener::bind(&opt.address).await?;
    log::info!("mTLS echo server listening on: {}", opt.address);

    loop {
        let (socket, peer) = listener.accept().await?;
        let credentials = credentials.clone();
        tokio::spawn(async move {
            if let Err(e) = serve(credentials, socket).await {
                log::error!("Connection from {} failed: {}", peer, e);
            }
        });
    }
}

/// Authenticate the peer, then echo everything it sends
async fn serve(
    credentials: TlsCredentials,
    socket: TcpStream,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let (mut stream, info) = credentials.server_handshake(socket).await?;
    let user = info
        .peer_identity()
        .and_then(|identity| identity.user_id().map(str::to_string))
        .unwrap_or_else(|| "unknown".to_string());
    log::info!(
        "Accepted {} over TLS {}",
        user,
        info.security_version().unwrap_or("?")
    );

    let mut buf = [0u8; 1024];
    loop {
        let n = stream.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        stream.write_all(&buf[..n]).await?;
    }
    Ok(())
}
