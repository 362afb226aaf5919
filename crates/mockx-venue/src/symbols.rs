/// Quote assets recognized when splitting concatenated venue symbols, longest first.
const KNOWN_QUOTES: [&str; 11] = [
    "FDUSD", "USDT", "USDC", "BUSD", "TUSD", "BTC", "ETH", "BNB", "EUR", "USD", "TRY",
];

/// Joins a unified `BASE/QUOTE` symbol into the concatenated venue form.
pub fn join_symbol(symbol: &str) -> String {
    symbol.replace('/', "").to_ascii_uppercase()
}

/// Splits a concatenated venue symbol such as `BTCUSDT` into `("BTC", "USDT")`.
pub fn split_symbol(raw: &str) -> Option<(String, String)> {
    let raw = raw.trim().to_ascii_uppercase();
    if let Some((base, quote)) = raw.split_once('/') {
        if base.is_empty() || quote.is_empty() {
            return None;
        }
        return Some((base.to_owned(), quote.to_owned()));
    }

    KNOWN_QUOTES.iter().find_map(|quote| {
        raw.strip_suffix(quote)
            .filter(|base| !base.is_empty())
            .map(|base| (base.to_owned(), (*quote).to_owned()))
    })
}
