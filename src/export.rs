//! Export of spider IP entries as usage-statistics queries.
//!
//! The statistics store keeps one `ip` field per recorded event, so table
//! entries are turned into prefix queries: a subnet entry `a.b.c` covers every
//! address starting with `a.b.c`.

/// Build the filter clause that excludes every spider entry.
///
/// The result is appended to an existing query, so it starts with ` AND `
/// when there is at least one entry and is empty otherwise.
///
/// # Examples
/// ```
/// use spiderdetect::export::exclusion_filter;
///
/// assert_eq!(
///     exclusion_filter(["1.2.3.4", "5.6.7"]),
///     " AND  NOT(ip: 1.2.3.4) NOT(ip: 5.6.7)"
/// );
/// assert_eq!(exclusion_filter(Vec::<String>::new()), "");
/// ```
pub fn exclusion_filter<I, S>(ips: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut query = String::new();
    for (i, ip) in ips.into_iter().enumerate() {
        if i == 0 {
            query.push_str(" AND ");
        }
        query.push_str(" NOT(ip: ");
        query.push_str(ip.as_ref());
        query.push(')');
    }
    query
}

/// Build one query per entry selecting events not yet flagged as bots.
pub fn bot_marking_queries<I, S>(ips: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    ips.into_iter()
        .map(|ip| format!("ip:{}* AND -isBot:true", ip.as_ref()))
        .collect()
}
