//! Property-based tests for the participant pair and the wire protocol
//!
//! Uses proptest to generate random inputs and verify properties

use proptest::prelude::*;
use saas_manager::shared::event::ClientEvent;
use saas_manager::shared::messaging::ParticipantPair;

proptest! {
    #[test]
    fn test_pair_is_symmetric(a in any::<i64>(), b in any::<i64>()) {
        prop_assume!(a != b);
        let forward = ParticipantPair::new(a, b).unwrap();
        let backward = ParticipantPair::new(b, a).unwrap();

        prop_assert_eq!(forward, backward);
        prop_assert!(forward.lo() < forward.hi());
        prop_assert!(forward.contains(a));
        prop_assert!(forward.contains(b));
    }

    #[test]
    fn test_pair_rejects_same_user(a in any::<i64>()) {
        prop_assert!(ParticipantPair::new(a, a).is_err());
    }

    #[test]
    fn test_decode_never_panics(text in ".*") {
        let _ = ClientEvent::decode(&text);
    }

    #[test]
    fn test_chat_object_decodes_to_chat(receiver_id in any::<i64>(), body in ".*") {
        let frame = serde_json::json!({ "receiver_id": receiver_id, "message": body });
        let event = ClientEvent::decode(&frame.to_string()).unwrap();

        match event {
            ClientEvent::Chat { receiver_id: decoded, message, .. } => {
                prop_assert_eq!(decoded, receiver_id);
                prop_assert_eq!(message, body);
            }
            other => prop_assert!(false, "decoded {:?} as non-chat", other),
        }
    }

    #[test]
    fn test_typing_flag_survives_decode(receiver_id in any::<i64>(), is_typing in any::<bool>()) {
        let frame = serde_json::json!({
            "type": "typing",
            "receiver_id": receiver_id,
            "is_typing": is_typing,
        });
        let event = ClientEvent::decode(&frame.to_string()).unwrap();

        prop_assert_eq!(event, ClientEvent::Typing { receiver_id, is_typing });
    }
}

#[cfg(feature = "ssr")]
mod store {
    use proptest::prelude::*;
    use saas_manager::backend::messaging::{ChatStore, MemoryChatStore};
    use saas_manager::shared::messaging::ParticipantPair;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn test_resolve_is_order_independent(a in 1i64..1000, b in 1i64..1000) {
            prop_assume!(a != b);
            let runtime = tokio::runtime::Builder::new_current_thread()
                .build()
                .unwrap();

            let (first, second, count) = runtime.block_on(async {
                let store = MemoryChatStore::new();
                let first = store
                    .resolve_or_create_conversation(ParticipantPair::new(a, b).unwrap())
                    .await
                    .unwrap();
                let second = store
                    .resolve_or_create_conversation(ParticipantPair::new(b, a).unwrap())
                    .await
                    .unwrap();
                (first, second, store.conversation_count().await)
            });

            prop_assert_eq!(first.id, second.id);
            prop_assert_eq!(count, 1);
            prop_assert_eq!(first.user1_id, a.min(b));
            prop_assert_eq!(first.user2_id, a.max(b));
        }
    }
}
