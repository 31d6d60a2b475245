use async_trait::async_trait;

use crate::lead::Offer;

/// Mail gateway: tells the site owner that an offer arrived.
#[async_trait]
pub trait OfferNotifier: Send + Sync + 'static {
    async fn notify_offer(&self, offer: &Offer) -> anyhow::Result<()>;
}

/// Subject line of the owner notification.
pub fn offer_subject(offer: &Offer) -> String {
    format!(
        "[Visitor #{}] New offer for {}",
        offer.visitor_number,
        offer.domain.as_deref().unwrap_or("unknown domain")
    )
}

/// HTML body of the owner notification. All submitted values are escaped.
pub fn offer_html(offer: &Offer) -> String {
    let field = |v: &Option<String>| escape_html(v.as_deref().unwrap_or(""));
    let duration = offer
        .duration_seconds
        .map(|d| d.to_string())
        .unwrap_or_else(|| "?".to_string());

    format!(
        "<h3>New offer received!</h3>\
         <p><strong>Domain:</strong> {domain}</p>\
         <p><strong>Name:</strong> {name}</p>\
         <p><strong>Email:</strong> {email}</p>\
         <p><strong>Offer:</strong> {comment}</p>\
         <hr>\
         <p><strong>Location:</strong> {location}</p>\
         <p><strong>Time on site:</strong> {duration} seconds</p>",
        domain = field(&offer.domain),
        name = field(&offer.name),
        email = field(&offer.email),
        comment = field(&offer.comment),
        location = escape_html(&offer.location),
    )
}

pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
