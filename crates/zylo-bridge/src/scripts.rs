//! Instrumentation scripts injected into the embedded content.
//!
//! These are data shipped across the bridge, not shell behavior. Each script
//! posts JSON messages matching the `ShellMessage` catalog. The storage key
//! and poll interval are substituted so hosts can retarget them without
//! editing script text.

/// Local-storage key the content uses for the auth token.
pub const DEFAULT_TOKEN_STORAGE_KEY: &str = "token";

/// Local-storage key holding the content's UI configuration (theme mode).
pub const DEFAULT_CONFIG_STORAGE_KEY: &str = "zylo-config";

/// Poll interval for storage inspection inside the content, in milliseconds.
pub const DEFAULT_STORAGE_POLL_MS: u64 = 1_000;

const TOKEN_EXTRACTION_TEMPLATE: &str = r#"
(function() {
  function postShellMessage(payload) {
    try {
      window.ReactNativeWebView.postMessage(JSON.stringify(payload));
    } catch (e) {}
  }

  var hooked = window.console;
  window.console = {
    log: function() { hooked.log.apply(hooked, arguments); postShellMessage({ type: 'console.log', data: Array.prototype.join.call(arguments, ' ') }); },
    info: function() { hooked.info.apply(hooked, arguments); postShellMessage({ type: 'console.info', data: Array.prototype.join.call(arguments, ' ') }); },
    warn: function() { hooked.warn.apply(hooked, arguments); postShellMessage({ type: 'console.warn', data: Array.prototype.join.call(arguments, ' ') }); },
    error: function() { hooked.error.apply(hooked, arguments); postShellMessage({ type: 'console.error', data: Array.prototype.join.call(arguments, ' ') }); }
  };

  var originalFetch = window.fetch;
  window.fetch = async function() {
    var url = arguments[0];
    try {
      var response = await originalFetch.apply(this, arguments);
      if (!response.ok && (String(url).includes('login') || String(url).includes('auth'))) {
        postShellMessage({ type: 'login.error', data: { status: response.status, url: String(url) } });
      }
      return response;
    } catch (error) {
      if (String(url).includes('login') || String(url).includes('auth')) {
        postShellMessage({ type: 'login.error', data: { url: String(url), error: error.message } });
      }
      throw error;
    }
  };

  function checkToken() {
    var token = localStorage.getItem('__TOKEN_KEY__');
    if (token) {
      postShellMessage({ type: 'token', value: token });
    } else {
      setTimeout(checkToken, __POLL_MS__);
    }
  }
  checkToken();

  window.addEventListener('storage', function(e) {
    if (e.key === '__TOKEN_KEY__' && e.newValue) {
      postShellMessage({ type: 'token', value: e.newValue });
    }
  });

  window.addEventListener('error', function(event) {
    postShellMessage({ type: 'global.error', data: {
      message: event.message,
      filename: event.filename,
      lineno: event.lineno
    } });
  });

  true;
})();
"#;

const THEME_PROBE_TEMPLATE: &str = r#"
(function() {
  try {
    var config = localStorage.getItem('__CONFIG_KEY__');
    var mode = 'light';
    if (config) {
      mode = (JSON.parse(config).mode) || 'light';
    }
    window.ReactNativeWebView.postMessage(JSON.stringify({ type: 'theme', mode: mode }));
  } catch (e) {
    window.ReactNativeWebView.postMessage(JSON.stringify({ type: 'theme', mode: 'light', error: e.message }));
  }
  true;
})();
"#;

const THEME_LISTENER_TEMPLATE: &str = r#"
(function() {
  var lastMode;
  function checkThemeChange() {
    try {
      var config = localStorage.getItem('__CONFIG_KEY__');
      if (config) {
        var currentMode = (JSON.parse(config).mode) || 'light';
        if (currentMode !== lastMode) {
          lastMode = currentMode;
          window.ReactNativeWebView.postMessage(JSON.stringify({ type: 'theme', mode: currentMode }));
        }
      }
    } catch (e) {}
  }
  setInterval(checkThemeChange, __POLL_MS__);
  window.addEventListener('storage', function(e) {
    if (e.key === '__CONFIG_KEY__') {
      checkThemeChange();
    }
  });
  true;
})();
"#;

/// Script extracting the auth token and wiring console/login/global error taps.
pub fn token_extraction_script(token_key: &str, poll_ms: u64) -> String {
    TOKEN_EXTRACTION_TEMPLATE
        .replace("__TOKEN_KEY__", token_key)
        .replace("__POLL_MS__", &poll_ms.to_string())
}

/// One-shot probe reporting the content's current theme mode.
pub fn theme_probe_script(config_key: &str) -> String {
    THEME_PROBE_TEMPLATE.replace("__CONFIG_KEY__", config_key)
}

/// Long-lived listener reporting theme mode changes as they happen.
pub fn theme_change_listener_script(config_key: &str, poll_ms: u64) -> String {
    THEME_LISTENER_TEMPLATE
        .replace("__CONFIG_KEY__", config_key)
        .replace("__POLL_MS__", &poll_ms.to_string())
}

#[cfg(test)]
mod tests {
    use super::{
        theme_change_listener_script, theme_probe_script, token_extraction_script,
        DEFAULT_CONFIG_STORAGE_KEY, DEFAULT_TOKEN_STORAGE_KEY,
    };

    #[test]
    fn unit_token_script_substitutes_key_and_interval() {
        let script = token_extraction_script(DEFAULT_TOKEN_STORAGE_KEY, 1_000);
        assert!(script.contains("localStorage.getItem('token')"));
        assert!(script.contains("setTimeout(checkToken, 1000)"));
        assert!(!script.contains("__TOKEN_KEY__"));
        assert!(!script.contains("__POLL_MS__"));
    }

    #[test]
    fn unit_theme_scripts_substitute_config_key() {
        let probe = theme_probe_script(DEFAULT_CONFIG_STORAGE_KEY);
        assert!(probe.contains("localStorage.getItem('zylo-config')"));

        let listener = theme_change_listener_script("custom-config", 500);
        assert!(listener.contains("localStorage.getItem('custom-config')"));
        assert!(listener.contains("setInterval(checkThemeChange, 500)"));
    }
}
