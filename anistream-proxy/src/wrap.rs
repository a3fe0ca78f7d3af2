//! Point resolved bundle URLs at this server's proxy routes

use anistream_core::models::SourceBundle;

use crate::rewrite::encode_query_value;

fn referer_of(headers: Option<&std::collections::HashMap<String, String>>) -> Option<&str> {
    headers?
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("referer"))
        .map(|(_, v)| v.as_str())
        .filter(|v| !v.is_empty())
}

/// Rewrite every URL in `bundle` to go through the proxy at
/// `public_base_url`: playlists via `/proxy/m3u8` carrying the Referer the
/// upstream asked for, everything else via `/proxy`.
#[must_use]
pub fn wrap_bundle(mut bundle: SourceBundle, public_base_url: &str) -> SourceBundle {
    let base = public_base_url.trim_end_matches('/');
    let proxy_prefix = format!("{base}/proxy");
    let bundle_referer = referer_of(Some(&bundle.headers)).map(ToString::to_string);

    for source in &mut bundle.sources {
        if source.url.starts_with(&proxy_prefix) {
            continue;
        }
        let target = encode_query_value(&source.url);
        source.url = if source.is_playlist {
            let referer = referer_of(source.headers.as_ref()).or(bundle_referer.as_deref());
            match referer {
                Some(referer) => format!(
                    "{proxy_prefix}/m3u8?url={target}&referer={}",
                    encode_query_value(referer)
                ),
                None => format!("{proxy_prefix}/m3u8?url={target}"),
            }
        } else {
            format!("{proxy_prefix}?url={target}")
        };
    }

    for track in &mut bundle.tracks {
        if !track.url.starts_with(&proxy_prefix) {
            track.url = format!("{proxy_prefix}?url={}", encode_query_value(&track.url));
        }
    }
    bundle
}
