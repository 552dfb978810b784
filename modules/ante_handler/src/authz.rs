//! Authorization depth limiter
//! Recursively scans grant/exec wrappers so that disallowed message types
//! can never reach execution, however deeply they are nested

use aegis_common::errors::AnteError;
use aegis_common::msgs::Msg;

/// Reject any disallowed message type reachable through authz wrappers.
///
/// With `search_only_inside_authz` set (the top-level call), plain messages
/// are left to the chain's own reject list and only grant/exec wrappers are
/// opened. Once inside an exec, every inner message is checked.
///
/// Recursion carries no explicit depth counter; nesting is bounded by the
/// envelope's size and gas limits, and a disallowed leaf fails at any depth.
pub fn check_disabled_msgs(
    msgs: &[Msg],
    disabled_type_urls: &[String],
    search_only_inside_authz: bool,
) -> Result<(), AnteError> {
    for msg in msgs {
        if !search_only_inside_authz && is_disabled(msg.type_url(), disabled_type_urls) {
            return Err(AnteError::Unauthorized(format!(
                "message type {} is not allowed through authz",
                msg.type_url()
            )));
        }
        match msg {
            Msg::Grant(grant) => {
                if is_disabled(&grant.authorization.msg_type_url, disabled_type_urls) {
                    return Err(AnteError::Unauthorized(format!(
                        "authorization for message type {} is not allowed",
                        grant.authorization.msg_type_url
                    )));
                }
            }
            Msg::Exec(exec) => {
                check_disabled_msgs(&exec.msgs, disabled_type_urls, false)?;
            }
            _ => {}
        }
    }
    Ok(())
}

fn is_disabled(type_url: &str, disabled: &[String]) -> bool {
    disabled.iter().any(|url| url == type_url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use aegis_common::msgs::{
        Authorization, EthTxData, LegacyTx, MsgEthereumTx, MsgExec, MsgGrant, MsgSend,
        TYPE_URL_ETHEREUM_TX,
    };

    fn disabled() -> Vec<String> {
        vec![TYPE_URL_ETHEREUM_TX.to_string()]
    }

    fn send() -> Msg {
        Msg::Send(MsgSend::default())
    }

    fn eth_tx() -> Msg {
        Msg::EthereumTx(MsgEthereumTx {
            data: EthTxData::Legacy(LegacyTx::default()),
            from: None,
        })
    }

    fn exec(msgs: Vec<Msg>) -> Msg {
        Msg::Exec(MsgExec {
            grantee: vec![1; 20],
            msgs,
        })
    }

    #[test]
    fn top_level_messages_are_left_to_the_reject_list() {
        // In authz-only mode a bare disallowed message passes here
        assert!(check_disabled_msgs(&[eth_tx()], &disabled(), true).is_ok());
        // But not when reached from inside an exec
        assert!(check_disabled_msgs(&[eth_tx()], &disabled(), false).is_err());
    }

    #[test]
    fn grant_of_disallowed_authorization_fails() {
        let grant = Msg::Grant(MsgGrant {
            granter: vec![1; 20],
            grantee: vec![2; 20],
            authorization: Authorization {
                msg_type_url: TYPE_URL_ETHEREUM_TX.to_string(),
            },
            expiration: None,
        });
        assert!(matches!(
            check_disabled_msgs(&[grant], &disabled(), true),
            Err(AnteError::Unauthorized(_))
        ));
    }

    #[test]
    fn exec_wrapped_disallowed_message_fails_at_any_depth() {
        let mut msg = eth_tx();
        for _ in 0..6 {
            msg = exec(vec![send(), msg]);
        }
        assert!(matches!(
            check_disabled_msgs(&[send(), msg], &disabled(), true),
            Err(AnteError::Unauthorized(_))
        ));
    }

    #[test]
    fn harmless_nesting_passes_regardless_of_depth() {
        let mut msg = send();
        for _ in 0..12 {
            msg = exec(vec![msg]);
        }
        assert!(check_disabled_msgs(&[msg], &disabled(), true).is_ok());
    }

    #[test]
    fn unrelated_valid_messages_do_not_mask_a_violation() {
        let wrapped = exec(vec![eth_tx()]);
        assert!(check_disabled_msgs(&[send(), wrapped, send()], &disabled(), true).is_err());
    }
}
