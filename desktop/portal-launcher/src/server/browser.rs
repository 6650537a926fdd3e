use portal_config::DEFAULT_PAGE;

/// Opens URLs for the user. Swapped out in tests.
pub trait BrowserLauncher: Send + Sync {
    fn open(&self, url: &str) -> std::io::Result<()>;
}

/// Platform default browser.
pub struct SystemBrowser;

impl BrowserLauncher for SystemBrowser {
    fn open(&self, url: &str) -> std::io::Result<()> {
        open::that(url)
    }
}

/// URL for `default_page` on a local server. The default page maps to the
/// site root, which the server redirects to the pages index.
pub fn portal_url(port: u16, default_page: &str) -> String {
    let page = if default_page == DEFAULT_PAGE {
        ""
    } else {
        default_page.trim_start_matches('/')
    };

    format!("http://localhost:{port}/{page}")
}
