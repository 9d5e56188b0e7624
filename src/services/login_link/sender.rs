use crate::config::SenderSettings;
use crate::services::smtp_mailer::Sender;

/// First present, non-blank value, scanning left to right.
pub fn first_configured<'a, I>(sources: I) -> Option<String>
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    sources
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|v| !v.is_empty())
        .map(str::to_string)
}

/// Resolves address and name independently over the ordered chain
/// (per-request, deployment, system). `None` when no level carries an address.
pub fn resolve_sender(chain: &[&SenderSettings]) -> Option<Sender> {
    let address = first_configured(chain.iter().map(|s| s.from_address.as_deref()))?;
    let name = first_configured(chain.iter().map(|s| s.from_name.as_deref()));
    Some(Sender { address, name })
}
