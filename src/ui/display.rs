use console::style;

use crate::crypto::KeyInfo;

/// `ok: <message>` on stderr.
pub fn ok(message: &str) {
    eprintln!("{} {}", style("ok:").green().bold(), message);
}

/// `warning: <message>` on stderr.
pub fn warning(message: &str) {
    eprintln!("{} {}", style("warning:").yellow().bold(), message);
}

/// An indented `label value` line under a status message.
pub fn info(label: &str, value: &str) {
    eprintln!("  {:<14}{}", style(label).bold(), value);
}

/// Algorithm and size, e.g. `RSA (4096 bits)`. Size is left out when unknown.
pub fn algorithm_label(key: &KeyInfo) -> String {
    if key.bits == 0 {
        key.algorithm.to_string()
    } else {
        format!("{} ({} bits)", key.algorithm, key.bits)
    }
}

/// Detail lines for a key: fingerprint and algorithm, then whichever of
/// creation date, expiry, revocation and secret material apply.
pub fn key_details(key: &KeyInfo) {
    info("fingerprint:", &key.fingerprint);
    info("algorithm:", &algorithm_label(key));
    if let Some(created) = key.created {
        info("created:", &created.to_rfc3339());
    }
    if let Some(expires) = key.expires {
        info("expires:", &style(expires.to_rfc3339()).yellow().to_string());
    }
    if key.revoked {
        info("status:", &style("revoked").red().to_string());
    }
    if key.is_private {
        info("contains:", &style("secret key material").red().to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Algorithm;

    fn key(algorithm: Algorithm, bits: u32) -> KeyInfo {
        KeyInfo {
            algorithm,
            bits,
            fingerprint: "7184F2BB11945AA9A29F321A99F8D6C210912A29".to_string(),
            is_private: false,
            revoked: false,
            expires: None,
            created: None,
        }
    }

    #[test]
    fn algorithm_label_includes_known_size() {
        assert_eq!(algorithm_label(&key(Algorithm::Rsa, 4096)), "RSA (4096 bits)");
        assert_eq!(
            algorithm_label(&key(Algorithm::Other("EdDSALegacy".to_string()), 0)),
            "EdDSALegacy"
        );
    }
}
