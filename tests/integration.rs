#![cfg(test)]

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use gatekeeper_bot::{
    base::{
        config::{Config, ConfigInner},
        prompts,
        types::{ChannelRef, ConversationTurn, FetchedMessage, InboundEvent, Outcome, Res, Void},
    },
    interaction::dispatch::Dispatcher,
    runtime::Runtime,
    service::{
        chat::{ChatClient, GenericChatClient},
        llm::{GenericLlmClient, LlmClient},
        lookup::{AnimeInfo, GenericLookupClient, LookupClient, NamedResource, PokemonInfo, PokemonSprites, PokemonTypeSlot},
    },
};
use mockall::mock;
use tokio::time::Instant;

// Mocks.

mock! {
    pub Chat {}

    #[async_trait]
    impl GenericChatClient for Chat {
        fn bot_user_id(&self) -> &str;
        async fn start(&self, dispatcher: Dispatcher) -> Void;
        async fn can_send(&self, channel: &ChannelRef) -> Res<bool>;
        async fn can_react(&self, channel: &ChannelRef) -> Res<bool>;
        async fn send_message(&self, channel: &ChannelRef, text: &str) -> Res<String>;
        async fn delete_message(&self, channel: &ChannelRef, message_id: &str) -> Void;
        async fn fetch_message(&self, channel: &ChannelRef, message_id: &str) -> Res<FetchedMessage>;
        async fn react_to_message(&self, channel: &ChannelRef, message_id: &str, emoji: &str) -> Void;
        async fn send_typing(&self, channel: &ChannelRef) -> Void;
    }
}

mock! {
    pub Llm {}

    #[async_trait]
    impl GenericLlmClient for Llm {
        async fn generate(&self, prompt: &str, history: &[ConversationTurn]) -> Res<String>;
    }
}

mock! {
    pub Lookup {}

    #[async_trait]
    impl GenericLookupClient for Lookup {
        async fn random_cat_image(&self) -> Res<String>;
        async fn search_anime(&self, title: &str) -> Res<AnimeInfo>;
        async fn search_pokemon(&self, name: &str) -> Res<PokemonInfo>;
    }
}

// Helpers.

const BOT: &str = "UBOT";
const USER: &str = "U1";
const CHANNEL: &str = "C_ALLOWED";

/// Everything the mocked chat platform was asked to do, with (paused) timestamps.
#[derive(Default)]
struct Recorder {
    sent: Mutex<Vec<(Instant, String, String)>>,
    deleted: Mutex<Vec<(Instant, String)>>,
}

impl Recorder {
    fn sent_texts(&self) -> Vec<String> {
        self.sent.lock().unwrap().iter().map(|(_, _, text)| text.clone()).collect()
    }

    fn deleted_ids(&self) -> Vec<String> {
        self.deleted.lock().unwrap().iter().map(|(_, id)| id.clone()).collect()
    }
}

fn test_config() -> Config {
    Config::from(ConfigInner {
        allowed_guild_id: "T1".to_string(),
        allowed_channel_id: CHANNEL.to_string(),
        restricted_channel_id: "C_RESTRICTED".to_string(),
        ..Default::default()
    })
}

/// A chat mock that records sends and deletes; `fail_sends` lists the
/// (zero-based) send calls that fail with a transport error.
fn get_mock_chat(recorder: Arc<Recorder>, fail_sends: Vec<usize>) -> MockChat {
    let mut mock = MockChat::new();

    mock.expect_bot_user_id().return_const(BOT.to_string());
    mock.expect_start().returning(|_| Ok(()));
    mock.expect_can_send().returning(|_| Ok(true));
    mock.expect_can_react().returning(|_| Ok(true));
    mock.expect_react_to_message().returning(|_, _, _| Ok(()));
    mock.expect_send_typing().returning(|_| Ok(()));
    mock.expect_fetch_message().returning(|_, _| Err(anyhow::anyhow!("not found")));

    let calls = Arc::new(Mutex::new(0usize));
    let send_recorder = recorder.clone();
    mock.expect_send_message().returning(move |_, text| {
        let mut calls = calls.lock().unwrap();
        let call = *calls;
        *calls += 1;

        if fail_sends.contains(&call) {
            return Err(anyhow::anyhow!("transport failure"));
        }

        let id = format!("M{call}");
        send_recorder.sent.lock().unwrap().push((Instant::now(), id.clone(), text.to_string()));
        Ok(id)
    });

    let delete_recorder = recorder;
    mock.expect_delete_message().returning(move |_, id| {
        delete_recorder.deleted.lock().unwrap().push((Instant::now(), id.to_string()));
        Ok(())
    });

    mock
}

fn setup_dispatcher(config: Config, chat: MockChat, llm: MockLlm, lookup: MockLookup) -> Dispatcher {
    let runtime = Runtime {
        config,
        llm: LlmClient::new(Arc::new(llm)),
        chat: ChatClient::new(Arc::new(chat)),
        lookup: LookupClient::new(Arc::new(lookup)),
    };

    runtime.dispatcher()
}

fn event(text: &str) -> InboundEvent {
    InboundEvent {
        author_id: USER.to_string(),
        guild_id: Some("T1".to_string()),
        channel: ChannelRef::new(CHANNEL, false),
        message_id: "100.1".to_string(),
        text: text.to_string(),
        ..Default::default()
    }
}

// Tests.

#[tokio::test(start_paused = true)]
async fn test_chat_command_records_history() {
    let recorder = Arc::new(Recorder::default());
    let chat = get_mock_chat(recorder.clone(), vec![]);

    let mut llm = MockLlm::new();
    llm.expect_generate()
        .withf(|prompt, history| prompt.ends_with("User input: hello") && history.is_empty())
        .times(1)
        .returning(|_, _| Ok("hi".to_string()));

    let dispatcher = setup_dispatcher(test_config(), chat, llm, MockLookup::new());

    let outcome = dispatcher.dispatch(event("y!chat hello")).await;

    assert_eq!(outcome, Outcome::Handled);
    assert_eq!(dispatcher.conversations().history(USER), vec![ConversationTurn::user("hello"), ConversationTurn::model("hi")]);

    // The indicator went out first, the reply second, and the indicator was removed.
    assert_eq!(recorder.sent_texts(), vec![prompts::CHAT_PROCESSING.to_string(), "hi".to_string()]);
    assert_eq!(recorder.deleted_ids(), vec!["M0".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_follow_up_chat_sees_history() {
    let recorder = Arc::new(Recorder::default());
    let chat = get_mock_chat(recorder.clone(), vec![]);

    let mut llm = MockLlm::new();
    llm.expect_generate().withf(|_, history| history.is_empty()).times(1).returning(|_, _| Ok("hi".to_string()));
    llm.expect_generate()
        .withf(|_, history| history.len() == 2 && history[0].text == "hello")
        .times(1)
        .returning(|_, _| Ok("fine, thanks".to_string()));

    let dispatcher = setup_dispatcher(test_config(), chat, llm, MockLookup::new());

    dispatcher.dispatch(event("y!chat hello")).await;

    // Wait out the per-action cooldown.
    tokio::time::advance(Duration::from_secs(30)).await;

    let mut mention = event("<@UBOT> how are you?");
    mention.mentions = vec![BOT.to_string()];
    dispatcher.dispatch(mention).await;

    let history = dispatcher.conversations().history(USER);
    assert_eq!(history.len(), 4);
    assert_eq!(history[2], ConversationTurn::user("how are you?"));
    assert_eq!(history[3], ConversationTurn::model("fine, thanks"));
}

#[tokio::test(start_paused = true)]
async fn test_restricted_notice_is_deleted_after_five_seconds() {
    let recorder = Arc::new(Recorder::default());
    let chat = get_mock_chat(recorder.clone(), vec![]);

    // The restricted channel is only reachable when it is also in scope.
    let config = Config::from(ConfigInner {
        allowed_guild_id: "T1".to_string(),
        allowed_channel_id: "C_SHARED".to_string(),
        restricted_channel_id: "C_SHARED".to_string(),
        ..Default::default()
    });

    let dispatcher = setup_dispatcher(config, chat, MockLlm::new(), MockLookup::new());

    let mut e = event("y!chat hello");
    e.channel = ChannelRef::new("C_SHARED", false);

    assert_eq!(dispatcher.dispatch(e).await, Outcome::Handled);

    // Let the scheduled deletion fire.
    tokio::time::sleep(Duration::from_secs(10)).await;

    let sent = recorder.sent.lock().unwrap().clone();
    let deleted = recorder.deleted.lock().unwrap().clone();

    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].2, prompts::RESTRICTED_CHANNEL_NOTICE);
    assert_eq!(deleted.len(), 1);
    assert_eq!(deleted[0].1, sent[0].1);
    assert_eq!(deleted[0].0 - sent[0].0, Duration::from_millis(5000));
}

#[tokio::test(start_paused = true)]
async fn test_failed_delivery_sends_exactly_one_error() {
    let recorder = Arc::new(Recorder::default());
    // Call 0 is the indicator; calls 1-3 are the three reply attempts.
    let chat = get_mock_chat(recorder.clone(), vec![1, 2, 3]);

    let mut llm = MockLlm::new();
    llm.expect_generate().times(1).returning(|_, _| Ok("hi".to_string()));

    let dispatcher = setup_dispatcher(test_config(), chat, llm, MockLookup::new());

    dispatcher.dispatch(event("y!chat hello")).await;

    let texts = recorder.sent_texts();
    assert_eq!(texts.iter().filter(|t| *t == prompts::DELIVERY_FAILURE_NOTICE).count(), 1);
    assert!(!texts.contains(&"hi".to_string()));
    assert_eq!(recorder.deleted_ids(), vec!["M0".to_string()]);
    assert!(dispatcher.conversations().history(USER).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_reply_delivered_on_third_attempt() {
    let recorder = Arc::new(Recorder::default());
    let chat = get_mock_chat(recorder.clone(), vec![1, 2]);

    let mut llm = MockLlm::new();
    llm.expect_generate().times(1).returning(|_, _| Ok("hi".to_string()));

    let dispatcher = setup_dispatcher(test_config(), chat, llm, MockLookup::new());

    dispatcher.dispatch(event("y!chat hello")).await;

    assert_eq!(recorder.sent_texts(), vec![prompts::CHAT_PROCESSING.to_string(), "hi".to_string()]);
    assert_eq!(dispatcher.conversations().history(USER).len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_generator_failure_leaves_history_untouched() {
    let recorder = Arc::new(Recorder::default());
    let chat = get_mock_chat(recorder.clone(), vec![]);

    let mut llm = MockLlm::new();
    llm.expect_generate().times(1).returning(|_, _| Err(anyhow::anyhow!("quota exceeded")));

    let dispatcher = setup_dispatcher(test_config(), chat, llm, MockLookup::new());

    dispatcher.dispatch(event("y!chat hello")).await;

    let texts = recorder.sent_texts();
    assert_eq!(texts.len(), 2);
    assert_eq!(texts[1], format!("{} quota exceeded", prompts::CHAT_FAILURE_NOTICE));
    assert_eq!(recorder.deleted_ids(), vec!["M0".to_string()]);
    assert!(dispatcher.conversations().history(USER).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_empty_mention_prompts_for_input() {
    let recorder = Arc::new(Recorder::default());
    let chat = get_mock_chat(recorder.clone(), vec![]);

    let mut llm = MockLlm::new();
    llm.expect_generate().never();

    let dispatcher = setup_dispatcher(test_config(), chat, llm, MockLookup::new());

    let mut mention = event("<@UBOT>");
    mention.mentions = vec![BOT.to_string()];

    assert_eq!(dispatcher.dispatch(mention).await, Outcome::Handled);
    assert_eq!(recorder.sent_texts(), vec![prompts::EMPTY_CHAT_PROMPT.to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_empty_mentions_do_not_count_against_the_user() {
    let recorder = Arc::new(Recorder::default());
    let chat = get_mock_chat(recorder.clone(), vec![]);

    let mut llm = MockLlm::new();
    llm.expect_generate().times(1).returning(|_, _| Ok("hi".to_string()));

    let config = Config::from(ConfigInner {
        allowed_guild_id: "T1".to_string(),
        allowed_channel_id: CHANNEL.to_string(),
        restricted_channel_id: "C_RESTRICTED".to_string(),
        send_pacing_ms: 0,
        ..Default::default()
    });

    let dispatcher = setup_dispatcher(config, chat, llm, MockLookup::new());

    // A burst of bare mentions, all at the same instant.
    for _ in 0..5 {
        let mut mention = event("<@UBOT>");
        mention.mentions = vec![BOT.to_string()];
        assert_eq!(dispatcher.dispatch(mention).await, Outcome::Handled);
    }

    // The guard has not seen any of them, so chat goes through.
    dispatcher.dispatch(event("y!chat hello")).await;

    // An empty chat command is still gated.
    dispatcher.dispatch(event("y!chat")).await;

    let mut expected = vec![prompts::EMPTY_CHAT_PROMPT.to_string(); 5];
    expected.extend([prompts::CHAT_PROCESSING.to_string(), "hi".to_string(), prompts::cooldown_notice(5.0)]);

    assert_eq!(recorder.sent_texts(), expected);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_chats_from_one_user_are_serialized() {
    let recorder = Arc::new(Recorder::default());
    let chat = get_mock_chat(recorder.clone(), vec![]);

    let seen_history = Arc::new(Mutex::new(Vec::new()));
    let seen = seen_history.clone();

    let mut llm = MockLlm::new();
    llm.expect_generate().times(2).returning(move |_, history| {
        seen.lock().unwrap().push(history.len());
        Ok("reply".to_string())
    });

    let config = Config::from(ConfigInner {
        allowed_guild_id: "T1".to_string(),
        allowed_channel_id: CHANNEL.to_string(),
        restricted_channel_id: "C_RESTRICTED".to_string(),
        cooldown_ms: 0,
        spam_threshold: 100,
        ..Default::default()
    });

    let dispatcher = setup_dispatcher(config, chat, llm, MockLookup::new());

    let (first, second) = tokio::join!(dispatcher.dispatch(event("y!chat first")), dispatcher.dispatch(event("y!chat second")));

    assert_eq!(first, Outcome::Handled);
    assert_eq!(second, Outcome::Handled);

    // The second exchange only started once the first one was recorded.
    assert_eq!(*seen_history.lock().unwrap(), vec![0, 2]);

    let history = dispatcher.conversations().history(USER);
    assert_eq!(
        history,
        vec![
            ConversationTurn::user("first"),
            ConversationTurn::model("reply"),
            ConversationTurn::user("second"),
            ConversationTurn::model("reply"),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_noise_is_ignored() {
    let recorder = Arc::new(Recorder::default());
    let chat = get_mock_chat(recorder.clone(), vec![]);

    let dispatcher = setup_dispatcher(test_config(), chat, MockLlm::new(), MockLookup::new());

    assert_eq!(dispatcher.dispatch(event("just talking to friends")).await, Outcome::Ignored);
    assert!(recorder.sent_texts().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_cooldown_and_spam_warnings() {
    let recorder = Arc::new(Recorder::default());
    let chat = get_mock_chat(recorder.clone(), vec![]);

    // No pacing, so only explicit clock advances move time.
    let config = Config::from(ConfigInner {
        allowed_guild_id: "T1".to_string(),
        allowed_channel_id: CHANNEL.to_string(),
        restricted_channel_id: "C_RESTRICTED".to_string(),
        send_pacing_ms: 0,
        ..Default::default()
    });

    let dispatcher = setup_dispatcher(config, chat, MockLlm::new(), MockLookup::new());

    // Unknown commands pass the guard but produce no reply.
    let unknown = || event("y!noop");

    dispatcher.dispatch(unknown()).await; // t0: allowed
    tokio::time::advance(Duration::from_secs(1)).await;
    dispatcher.dispatch(unknown()).await; // t1: cooldown, 4s left
    tokio::time::advance(Duration::from_secs(1)).await;
    dispatcher.dispatch(unknown()).await; // t2: cooldown, 3s left
    tokio::time::advance(Duration::from_secs(3)).await;
    dispatcher.dispatch(unknown()).await; // t5: burst in window, spam
    tokio::time::advance(Duration::from_secs(1)).await;
    dispatcher.dispatch(unknown()).await; // t6: spam cooldown, 9s left

    assert_eq!(
        recorder.sent_texts(),
        vec![
            prompts::cooldown_notice(4.0),
            prompts::cooldown_notice(3.0),
            prompts::spam_notice(USER),
            prompts::cooldown_notice(9.0),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_pokemon_command() {
    let recorder = Arc::new(Recorder::default());
    let chat = get_mock_chat(recorder.clone(), vec![]);

    let mut lookup = MockLookup::new();
    lookup.expect_search_pokemon().withf(|name| name == "mr-mime").times(1).returning(|_| {
        Ok(PokemonInfo {
            id: 122,
            name: "mr-mime".to_string(),
            types: vec![
                PokemonTypeSlot {
                    kind: NamedResource { name: "psychic".to_string() },
                },
                PokemonTypeSlot {
                    kind: NamedResource { name: "fairy".to_string() },
                },
            ],
            height: 13,
            weight: 545,
            sprites: PokemonSprites::default(),
        })
    });

    let dispatcher = setup_dispatcher(test_config(), chat, MockLlm::new(), lookup);

    dispatcher.dispatch(event("y!pokemon Mr. Mime")).await;

    let texts = recorder.sent_texts();
    assert_eq!(texts[0], prompts::POKEMON_PROCESSING);
    assert_eq!(
        texts[1],
        "⚡ Pokémon: Mr-mime #122 ⚡\nTypes: psychic, fairy\nHeight: 1.3 m\nWeight: 54.5 kg\nSprite: None"
    );
    assert_eq!(recorder.deleted_ids(), vec!["M0".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_anime_command_failure_and_usage() {
    let recorder = Arc::new(Recorder::default());
    let chat = get_mock_chat(recorder.clone(), vec![]);

    let mut lookup = MockLookup::new();
    lookup.expect_search_anime().times(1).returning(|_| Err(anyhow::anyhow!("No anime found.")));

    let config = Config::from(ConfigInner {
        allowed_guild_id: "T1".to_string(),
        allowed_channel_id: CHANNEL.to_string(),
        restricted_channel_id: "C_RESTRICTED".to_string(),
        cooldown_ms: 0,
        ..Default::default()
    });

    let dispatcher = setup_dispatcher(config, chat, MockLlm::new(), lookup);

    dispatcher.dispatch(event("y!anime")).await;
    tokio::time::advance(Duration::from_secs(30)).await;
    dispatcher.dispatch(event("y!anime Nonexistent Show")).await;

    assert_eq!(
        recorder.sent_texts(),
        vec![
            prompts::ANIME_USAGE.to_string(),
            prompts::ANIME_PROCESSING.to_string(),
            prompts::ANIME_FAILURE_NOTICE.to_string(),
        ]
    );
}
