//! Command line arguments for the client

use structopt::StructOpt;

#[derive(StructOpt, Debug)]
pub struct Args {
    /// The server host + port to connect to.
    #[structopt(short = "a", long, default_value = "localhost:50051")]
    pub address: String,

    /// Client certificate
    #[structopt(long, default_value = "tls/client.pem")]
    pub cert: String,

    /// Client private key
    #[structopt(long, default_value = "tls/client.key")]
    pub key: String,

    /// CA bundle the server is verified against
    #[structopt(long, default_value = "tls/ca.pem")]
    pub ca: String,

    /// Verify the server against this name instead of the dialed host
    #[structopt(long)]
    pub server_name: Option<String>,

    /// Message to send
    #[structopt(default_value = "hello")]
    pub message: String,
}
