//! Feed and article fixtures

/// Feed URL accepted by the default feed policy
pub const FEED_URL: &str = "https://rss.blog.naver.com/someblog.xml";

/// Article link as it appears in the feed
pub fn post_url(n: u32) -> String {
    format!("https://blog.naver.com/someblog/{n}?fromRss=true&trackingCode=rss")
}

/// Desktop viewer candidate for post `n`
pub fn viewer_url(n: u32) -> String {
    format!(
        "https://blog.naver.com/PostView.naver?blogId=someblog&logNo={n}&redirect=Dlog&widgetTypeCall=true&directAccess=false"
    )
}

/// Mobile candidate for post `n`
pub fn mobile_url(n: u32) -> String {
    format!("https://m.blog.naver.com/someblog/{n}")
}

/// RSS 2.0 feed with one `<item><link>` per entry of `links`
pub fn rss_feed(links: &[String]) -> String {
    let items: String = links
        .iter()
        .map(|link| {
            format!(
                "<item><title>post</title><link>{}</link><description>d</description></item>",
                link.replace('&', "&amp;")
            )
        })
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>someblog</title>
    <link>https://blog.naver.com/someblog</link>
    <description>someblog feed</description>
    {items}
  </channel>
</rss>"#
    )
}

/// Article body of exactly `chars` characters, tagged so posts are distinguishable
pub fn body_text(tag: char, chars: usize) -> String {
    std::iter::once(tag)
        .chain(std::iter::repeat_n('가', chars.saturating_sub(1)))
        .collect()
}

/// Desktop viewer page whose editor container holds `text`, surrounded by noise
pub fn viewer_page(text: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
  <title>someblog</title>
  <style>.se-main-container {{ color: black; }}</style>
  <script>window.__tracking = "{filler}";</script>
</head>
<body>
  <div id="whole-border">
    <div class="se-main-container"><div class="se-component se-text"><p class="se-text-paragraph">{text}</p></div></div>
    <div class="revenue_unit_wrap">광고 {filler}</div>
    <div class="u_cbox">댓글 {filler}</div>
  </div>
</body>
</html>"#,
        filler = "x".repeat(400)
    )
}
