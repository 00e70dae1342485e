//! Identity helper backed by the loaded configuration

use authgate_core::IdentityHelper;
use authgate_domain::GatewayConfig;

/// Client registration resolved once from [`GatewayConfig`]
#[derive(Debug, Clone)]
pub struct ConfiguredIdentity {
    client_id: String,
    admin_consent_url: String,
}

impl ConfiguredIdentity {
    #[must_use]
    pub fn from_config(config: &GatewayConfig) -> Self {
        let client_id = config.provider.client_id.clone();
        let admin_consent_url = format!(
            "{}?client_id={}&redirect_uri={}",
            config.provider.admin_consent_endpoint(),
            urlencoding::encode(&client_id),
            urlencoding::encode(&config.server.redirect_uri()),
        );
        Self { client_id, admin_consent_url }
    }
}

impl IdentityHelper for ConfiguredIdentity {
    fn client_id(&self) -> &str {
        &self.client_id
    }

    fn admin_consent_url(&self) -> String {
        self.admin_consent_url.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consent_url_targets_tenant_admin_endpoint() {
        let mut config = GatewayConfig::for_client("client-123");
        config.provider.tenant = "contoso.onmicrosoft.com".to_string();

        let identity = ConfiguredIdentity::from_config(&config);

        assert_eq!(identity.client_id(), "client-123");
        assert_eq!(
            identity.admin_consent_url(),
            "https://login.microsoftonline.com/contoso.onmicrosoft.com/adminconsent\
             ?client_id=client-123&redirect_uri=http%3A%2F%2Flocalhost%3A8080%2Fcallback"
        );
    }
}
