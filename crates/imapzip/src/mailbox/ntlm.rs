//! SASL NTLM authentication for IMAP.
//!
//! Message encoding and the NTLMv2 response are computed by `ntlmclient`;
//! this module only drives the two-step exchange expected by
//! `AUTHENTICATE NTLM`.

use log::{debug, warn};
use secrecy::{ExposeSecret, SecretString};

/// Negotiate Unicode.
pub const NTLM_NEGOTIATE_UNICODE: u32 = 0x0000_0001;
/// Request Target.
pub const NTLM_REQUEST_TARGET: u32 = 0x0000_0004;
/// Negotiate NTLM.
pub const NTLM_NEGOTIATE_NTLM: u32 = 0x0000_0200;
/// Negotiate Always Sign.
pub const NTLM_NEGOTIATE_ALWAYS_SIGN: u32 = 0x0000_8000;

/// Flags used when NTLM is enabled without an explicit bitmask (`0x00008205`).
pub const NTLM_DEFAULT_FLAGS: u32 = NTLM_NEGOTIATE_UNICODE
    | NTLM_REQUEST_TARGET
    | NTLM_NEGOTIATE_NTLM
    | NTLM_NEGOTIATE_ALWAYS_SIGN;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Negotiate,
    Authenticate,
    Done,
}

/// Answers the server's NTLM continuations: first the NEGOTIATE message,
/// then the AUTHENTICATE message computed from the server's CHALLENGE.
pub struct NtlmAuthenticator {
    username: String,
    password: SecretString,
    domain: String,
    flags: u32,
    workstation: String,
    step: Step,
}

impl NtlmAuthenticator {
    pub fn new(username: &str, password: &SecretString, domain: &str, flags: u32) -> Self {
        Self {
            username: username.to_string(),
            password: SecretString::from(password.expose_secret().to_string()),
            domain: domain.to_string(),
            flags,
            workstation: std::env::var("HOSTNAME").unwrap_or_default(),
            step: Step::Negotiate,
        }
    }

    fn negotiate_flags(&self) -> ntlmclient::Flags {
        ntlmclient::Flags::from_bits_truncate(self.flags)
    }

    fn negotiate_message(&self) -> Result<Vec<u8>, String> {
        let message = ntlmclient::Message::Negotiate(ntlmclient::NegotiateMessage {
            flags: self.negotiate_flags(),
            supplied_domain: String::new(),
            supplied_workstation: String::new(),
            os_version: Default::default(),
        });
        message
            .to_bytes()
            .map_err(|e| format!("failed to encode NTLM negotiate message: {:?}", e))
    }

    fn authenticate_message(&self, challenge: &[u8]) -> Result<Vec<u8>, String> {
        let challenge = match ntlmclient::Message::try_from(challenge) {
            Ok(ntlmclient::Message::Challenge(challenge)) => challenge,
            Ok(other) => return Err(format!("expected NTLM challenge, got {:?}", other)),
            Err(e) => return Err(format!("malformed NTLM challenge: {:?}", e)),
        };

        let target_info: Vec<u8> = challenge
            .target_information
            .iter()
            .flat_map(|entry| entry.to_bytes())
            .collect();

        let credentials = ntlmclient::Credentials {
            username: self.username.clone(),
            password: self.password.expose_secret().to_string(),
            domain: self.domain.clone(),
        };

        let response = ntlmclient::respond_challenge_ntlm_v2(
            challenge.challenge,
            &target_info,
            ntlmclient::get_ntlm_time(),
            &credentials,
        );

        response
            .to_message(&credentials, &self.workstation, self.negotiate_flags())
            .to_bytes()
            .map_err(|e| format!("failed to encode NTLM authenticate message: {:?}", e))
    }
}

impl async_imap::Authenticator for NtlmAuthenticator {
    type Response = Vec<u8>;

    fn process(&mut self, data: &[u8]) -> Self::Response {
        let result = match self.step {
            Step::Negotiate => {
                self.step = Step::Authenticate;
                debug!("Sending NTLM negotiate message (flags={:#010x})", self.flags);
                self.negotiate_message()
            }
            Step::Authenticate => {
                self.step = Step::Done;
                debug!("Answering NTLM challenge for domain '{}'", self.domain);
                self.authenticate_message(data)
            }
            Step::Done => Err("server sent an unexpected extra NTLM continuation".to_string()),
        };

        // An empty answer makes the server reject the exchange with a tagged NO
        result.unwrap_or_else(|e| {
            warn!("NTLM authentication step failed: {}", e);
            Vec::new()
        })
    }
}
