use fx_core::NewHigh;

pub struct MessageTemplate;

impl MessageTemplate {
    /// Alert sent when a pair prints a new all-time high. Rates are always
    /// rendered with four decimals.
    pub fn new_high(event: &NewHigh, public_url: &str) -> String {
        format!(
            "🚀 New All-Time High Alert!\n\n{} has reached {}{:.4}, breaking the previous record!\n\nTrack more at: {}",
            event.pair.label(),
            currency_symbol(event.pair.quote()),
            event.rate,
            public_url
        )
    }

    /// Confirmation sent right after subscribing.
    pub fn welcome(threshold: f64, public_url: &str) -> String {
        format!(
            "✅ You're subscribed to GBP all-time-high alerts.\n\nWe'll message you on WhatsApp when the rate reaches {:.4} or higher.\n\nManage your subscription at: {}",
            threshold, public_url
        )
    }
}

fn currency_symbol(code: &str) -> &'static str {
    match code {
        "USD" => "$",
        "EUR" => "€",
        "JPY" => "¥",
        "GBP" => "£",
        _ => "",
    }
}
