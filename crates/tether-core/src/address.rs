use std::io;
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};

/// Resolves `host:port` to the first address the resolver returns.
pub fn resolve_socket_addr(host: &str, port: u16) -> io::Result<SocketAddr> {
    (host, port)
        .to_socket_addrs()?
        .next()
        .ok_or_else(|| io::Error::new(io::ErrorKind::AddrNotAvailable, "no resolved addresses"))
}

/// Shuts down both directions of a stream.
///
/// A peer that already went away leaves the socket disconnected; that is
/// not reported as a failure.
pub fn shutdown_stream(stream: &TcpStream) -> io::Result<()> {
    match stream.shutdown(Shutdown::Both) {
        Err(error) if error.kind() != io::ErrorKind::NotConnected => Err(error),
        _ => Ok(()),
    }
}
