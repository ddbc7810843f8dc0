//! Bindings of the contracts the bidder interacts with. Only the parts that
//! are used are declared.

alloy::sol! {
    #[sol(rpc)]
    interface OevAuctionHouse {
        event AwardedBid(
            address indexed bidder,
            bytes32 indexed bidTopic,
            bytes32 indexed bidId,
            bytes awardDetails,
            uint256 bidderBalance
        );

        event ConfirmedFulfillment(
            address indexed bidder,
            bytes32 indexed bidTopic,
            bytes32 indexed bidId,
            bytes payload,
            uint32 timestamp
        );

        function placeBidWithExpiration(
            bytes32 bidTopic,
            uint256 chainId,
            uint256 bidAmount,
            bytes calldata bidDetails,
            uint256 maxCollateralAmount,
            uint256 maxProtocolFeeAmount,
            uint32 expirationTimestamp
        ) external returns (uint256 collateralAmount, uint256 protocolFeeAmount);

        function bids(bytes32 bidId)
            external
            view
            returns (
                uint8 status,
                address bidder,
                uint256 bidAmount,
                uint32 signedDataTimestampCutoff,
                uint256 chainId,
                uint256 collateralAmount,
                uint256 protocolFeeAmount
            );

        function reportFulfillment(
            bytes32 bidTopic,
            bytes32 bidDetailsHash,
            bytes calldata fulfillmentDetails
        ) external;
    }

    #[sol(rpc)]
    interface OevFeedUpdater {
        struct PayOevBidCallbackData {
            bytes[] signedDataArray;
        }

        struct PayBidAndUpdateFeeds {
            uint32 signedDataTimestampCutoff;
            bytes signature;
            uint256 bidAmount;
            PayOevBidCallbackData payOevBidCallbackData;
        }

        function payBidAndUpdateFeed(PayBidAndUpdateFeeds calldata params) external payable;
    }

    #[sol(rpc)]
    interface Api3ServerV1 {
        function dapiNameHashToDataFeedId(bytes32 dapiNameHash)
            external
            view
            returns (bytes32 dataFeedId);
    }

    #[sol(rpc)]
    interface AirseekerRegistry {
        function dataFeedIdToDetails(bytes32 dataFeedId)
            external
            view
            returns (bytes memory dataFeedDetails);
    }
}
