//! The §4.11 authorisation guard: parses the `Authorization` header (§6),
//! checks IP/HWID and creator bans (C4), and authenticates the creator
//! through C5. Every write-path operation runs this before mutating state.

use hof_ban_registry::BanRegistry;
use hof_creator_registry::{CreatorRegistry, ModAuth, SimpleAuth};
use hof_domain_models::{Creator, CoreError, CreatorIdProvider};
use percent_encoding::percent_decode_str;
use tracing::instrument;
use uuid::Uuid;

/// One of the two authorisation schemes of spec §6, already parsed out of
/// the raw header value.
enum ParsedAuth {
    Simple(SimpleAuth),
    Mod(ModAuth),
}

/// C4 (bans) + C5 (authentication) wired behind the single guard spec
/// §4.11 describes. Stateless beyond its two collaborators — cheap to
/// clone and share across request pipelines.
#[derive(Clone)]
pub struct AuthorizationGuard {
    bans: BanRegistry,
    creators: CreatorRegistry,
}

impl AuthorizationGuard {
    pub fn new(bans: BanRegistry, creators: CreatorRegistry) -> Self {
        Self { bans, creators }
    }

    /// Runs the full §4.11 flow. A missing header is anonymous pass-through
    /// — `Ok(None)` — and skips every ban check; it is up to the caller to
    /// decide whether anonymity is acceptable for the operation at hand.
    #[instrument(skip(self, header))]
    pub async fn authorize(
        &self,
        header: Option<&str>,
        ip: &str,
    ) -> Result<Option<Creator>, CoreError> {
        let Some(header) = header else {
            return Ok(None);
        };

        let parsed = parse_authorization_header(header, ip)?;

        let creator = match parsed {
            ParsedAuth::Simple(auth) => {
                self.bans.ensure_not_banned(&auth.ip, None).await?;
                self.creators.authenticate_simple(&auth).await?
            }
            ParsedAuth::Mod(auth) => {
                self.bans.ensure_not_banned(&auth.ip, Some(&auth.hwid)).await?;
                self.creators.authenticate_mod(&auth).await?
            }
        };

        self.bans.ensure_creator_not_banned(&creator).await?;
        Ok(Some(creator))
    }
}

fn parse_authorization_header(header: &str, ip: &str) -> Result<ParsedAuth, CoreError> {
    let header = header.trim();
    let (scheme, rest) = header
        .split_once(char::is_whitespace)
        .ok_or_else(|| CoreError::InvalidPayload("malformed Authorization header".to_string()))?;
    let rest = rest.trim();

    if scheme.eq_ignore_ascii_case("CreatorID") {
        let creator_id = Uuid::parse_str(rest)
            .map_err(|_| CoreError::InvalidPayload("malformed CreatorID value".to_string()))?;
        Ok(ParsedAuth::Simple(SimpleAuth {
            creator_id,
            ip: ip.to_string(),
        }))
    } else if scheme.eq_ignore_ascii_case("Creator") {
        parse_mod_auth(rest, ip).map(ParsedAuth::Mod)
    } else {
        Err(CoreError::InvalidPayload(format!(
            "unrecognised Authorization scheme: {scheme}"
        )))
    }
}

fn parse_mod_auth(rest: &str, ip: &str) -> Result<ModAuth, CoreError> {
    let mut name: Option<String> = None;
    let mut id: Option<Uuid> = None;
    let mut provider: Option<CreatorIdProvider> = None;
    let mut hwid: Option<String> = None;

    for pair in rest.split('&').filter(|p| !p.is_empty()) {
        let (key, raw_value) = pair.split_once('=').ok_or_else(|| {
            CoreError::InvalidPayload(format!("malformed Authorization field: {pair}"))
        })?;
        let value = percent_decode_str(raw_value)
            .decode_utf8()
            .map_err(|_| CoreError::InvalidPayload("Authorization field is not utf-8".to_string()))?
            .into_owned();

        match key {
            "name" => name = Some(value),
            "id" => {
                id = Some(Uuid::parse_str(&value).map_err(|_| {
                    CoreError::InvalidPayload("malformed id in Authorization header".to_string())
                })?)
            }
            "provider" => {
                provider = Some(match value.as_str() {
                    "paradox" => CreatorIdProvider::Paradox,
                    "local" => CreatorIdProvider::Local,
                    other => {
                        return Err(CoreError::InvalidPayload(format!(
                            "unrecognised provider in Authorization header: {other}"
                        )))
                    }
                })
            }
            "hwid" => hwid = Some(value),
            _ => {}
        }
    }

    let creator_id = id.ok_or_else(|| {
        CoreError::InvalidPayload("Authorization header is missing id".to_string())
    })?;
    let creator_id_provider = provider.ok_or_else(|| {
        CoreError::InvalidPayload("Authorization header is missing provider".to_string())
    })?;
    let hwid = hwid.filter(|h| !h.is_empty()).ok_or_else(|| {
        CoreError::InvalidPayload("Authorization header is missing a non-empty hwid".to_string())
    })?;

    Ok(ModAuth {
        creator_id,
        creator_id_provider,
        creator_name: name.filter(|n| !n.is_empty()),
        hwid,
        ip: ip.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_the_simple_scheme_case_insensitively() {
        let id = Uuid::new_v4();
        let header = format!("creatorid {id}");
        let parsed = parse_authorization_header(&header, "1.2.3.4").expect("parses");
        assert!(matches!(parsed, ParsedAuth::Simple(auth) if auth.creator_id == id));
    }

    #[test]
    fn parses_the_mod_scheme_with_percent_encoded_name() {
        let id = Uuid::new_v4();
        let header = format!("Creator name=Alice%20B&id={id}&provider=paradox&hwid=H1");
        let parsed = parse_authorization_header(&header, "1.2.3.4").expect("parses");
        match parsed {
            ParsedAuth::Mod(auth) => {
                assert_eq!(auth.creator_name.as_deref(), Some("Alice B"));
                assert_eq!(auth.creator_id_provider, CreatorIdProvider::Paradox);
                assert_eq!(auth.hwid, "H1");
            }
            _ => panic!("expected a mod auth"),
        }
    }

    #[test]
    fn mod_scheme_allows_an_empty_name_for_an_anonymous_creator() {
        let id = Uuid::new_v4();
        let header = format!("Creator name=&id={id}&provider=local&hwid=H1");
        let parsed = parse_authorization_header(&header, "1.2.3.4").expect("parses");
        assert!(matches!(parsed, ParsedAuth::Mod(auth) if auth.creator_name.is_none()));
    }

    #[test]
    fn rejects_an_unrecognised_scheme() {
        let err = parse_authorization_header("Bearer abc123", "1.2.3.4").unwrap_err();
        assert!(matches!(err, CoreError::InvalidPayload(_)));
    }

    #[test]
    fn mod_scheme_rejects_an_empty_hwid() {
        let id = Uuid::new_v4();
        let header = format!("Creator name=Alice&id={id}&provider=local&hwid=");
        let err = parse_authorization_header(&header, "1.2.3.4").unwrap_err();
        assert!(matches!(err, CoreError::InvalidPayload(_)));
    }
}
