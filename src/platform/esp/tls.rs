use esp_idf_svc::sys::{EspError, ESP_ERR_INVALID_STATE};
use esp_idf_svc::tls::{Config, EspTls, InternalSocket, X509};

use crate::config::ServiceConfig;
use crate::transport::{Readiness, SecureTransport};

const RX_BUFFER_SIZE: usize = 512;

/// esp-tls client socket with a small receive buffer for line reads.
pub struct EspTlsTransport {
    tls: Option<EspTls<InternalSocket>>,
    // NUL-terminated PEM, as mbedTLS expects
    ca_pem: Vec<u8>,
    timeout_ms: u32,
    rx: [u8; RX_BUFFER_SIZE],
    rx_pos: usize,
    rx_len: usize,
    eof: bool,
}

impl EspTlsTransport {
    pub fn new(config: &ServiceConfig) -> Self {
        Self {
            tls: None,
            ca_pem: Vec::new(),
            timeout_ms: config.response_timeout_secs.saturating_mul(1000),
            rx: [0; RX_BUFFER_SIZE],
            rx_pos: 0,
            rx_len: 0,
            eof: false,
        }
    }

    fn session(&mut self) -> Result<&mut EspTls<InternalSocket>, EspError> {
        self.tls
            .as_mut()
            .ok_or_else(EspError::from_infallible::<ESP_ERR_INVALID_STATE>)
    }

    fn buffered(&self) -> usize {
        self.rx_len - self.rx_pos
    }

    // Refill the receive buffer; false once the peer has closed
    fn fill(&mut self) -> Result<bool, EspError> {
        if self.buffered() > 0 {
            return Ok(true);
        }
        if self.eof {
            return Ok(false);
        }
        let mut rx = [0u8; RX_BUFFER_SIZE];
        let n = self.session()?.read(&mut rx)?;
        if n == 0 {
            self.eof = true;
            return Ok(false);
        }
        self.rx[..n].copy_from_slice(&rx[..n]);
        self.rx_pos = 0;
        self.rx_len = n;
        Ok(true)
    }
}

impl SecureTransport for EspTlsTransport {
    type Error = EspError;

    fn set_trust_anchor(&mut self, pem: &str) -> Result<(), EspError> {
        self.ca_pem.clear();
        self.ca_pem.extend_from_slice(pem.as_bytes());
        self.ca_pem.push(0);
        Ok(())
    }

    fn connect(&mut self, host: &str, port: u16) -> Result<(), EspError> {
        let mut tls = EspTls::new()?;
        let config = Config {
            common_name: Some(host),
            ca_cert: Some(X509::pem_until_nul(&self.ca_pem)),
            timeout_ms: self.timeout_ms,
            ..Default::default()
        };
        tls.connect(host, port, &config)?;

        self.tls = Some(tls);
        self.rx_pos = 0;
        self.rx_len = 0;
        self.eof = false;
        Ok(())
    }

    fn write_all(&mut self, mut data: &[u8]) -> Result<(), EspError> {
        let tls = self.session()?;
        while !data.is_empty() {
            let n = tls.write(data)?;
            data = &data[n..];
        }
        Ok(())
    }

    fn poll_readable(&mut self) -> Result<Readiness, EspError> {
        // esp-tls reads block up to timeout_ms, so there is no Pending state here
        Ok(if self.fill()? { Readiness::Ready } else { Readiness::Closed })
    }

    fn read_line(&mut self, buf: &mut [u8]) -> Result<Option<usize>, EspError> {
        let mut n = 0;
        while n < buf.len() {
            if !self.fill()? {
                return Ok(if n == 0 { None } else { Some(n) });
            }
            let byte = self.rx[self.rx_pos];
            self.rx_pos += 1;
            if byte == b'\n' {
                return Ok(Some(n));
            }
            buf[n] = byte;
            n += 1;
        }
        Ok(Some(n))
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, EspError> {
        if !self.fill()? {
            return Ok(0);
        }
        let n = self.buffered().min(buf.len());
        buf[..n].copy_from_slice(&self.rx[self.rx_pos..self.rx_pos + n]);
        self.rx_pos += n;
        Ok(n)
    }

    fn close(&mut self) {
        // Dropping the handle tears down the TLS session and socket
        self.tls = None;
        self.rx_pos = 0;
        self.rx_len = 0;
    }
}
